//! The encoded data matrix: a frozen container plus projected batches.

use ndarray::{Array2, s};

use crate::config::{FeatureMatching, RecodeConfig};
use crate::data::{Batch, BatchSource};
use crate::error::{CategoryError, SchemaError};
use crate::schema::{CategoriesExport, CategoryContainer, SchemaBuilder};

use super::project::Projection;
use super::recoder::{ProjectedBatch, Recoder};

/// A dataset whose categorical features carry canonical codes.
///
/// Construction builds the categorical schema from the data itself, freezes
/// it, then projects every batch onto it. A validation or inference dataset
/// instead borrows the schema of a reference dataset and projects strictly
/// ([`with_reference`](Self::with_reference)), so its codes mean the same as
/// the reference's regardless of how its own dictionaries were ordered.
///
/// # Example
///
/// ```
/// use catcodes::{Batch, CategoricalColumn, EncodedDataset, RecodeConfig};
///
/// let config = RecodeConfig::default();
/// let train = Batch::new(vec![
///     CategoricalColumn::from_strs(&[Some("b"), Some("a")]).into(),
/// ])
/// .unwrap();
/// let valid = Batch::new(vec![
///     CategoricalColumn::from_strs(&[Some("a"), Some("b")]).into(),
/// ])
/// .unwrap();
///
/// let train = EncodedDataset::from_batches(&[train], &config).unwrap();
/// let valid = EncodedDataset::with_reference(&[valid], train.categories(), &config).unwrap();
///
/// assert_eq!(train.batches()[0].codes(0).unwrap().as_slice(), &[1, 0]);
/// assert_eq!(valid.batches()[0].codes(0).unwrap().as_slice(), &[0, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct EncodedDataset {
    categories: CategoryContainer,
    batches: Vec<ProjectedBatch>,
    n_rows: usize,
    config: RecodeConfig,
}

impl EncodedDataset {
    /// Build from in-memory batches.
    ///
    /// # Errors
    ///
    /// Any schema construction error; see [`SchemaBuilder::push`].
    pub fn from_batches(batches: &[Batch], config: &RecodeConfig) -> Result<Self, CategoryError> {
        config.install(|parallelism| -> Result<Self, CategoryError> {
            let mut builder = SchemaBuilder::new(config.clone());
            for batch in batches {
                builder.push_with(batch, parallelism)?;
            }
            let categories = builder.finish();

            let recoder = own_recoder(&categories, config);
            let projected = batches
                .iter()
                .map(|batch| recoder.project_with(batch, Projection::Trusted, parallelism))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Self::assemble(categories, projected, config))
        })?
    }

    /// Build from a resettable batch source.
    ///
    /// The source is walked twice: once to build the schema, once to project.
    /// It must replay the same batches in the same order. Only one batch is
    /// held at a time.
    ///
    /// # Errors
    ///
    /// Any source error, any schema construction error, and
    /// [`SchemaError::BatchSource`] if the replay differs from the first pass:
    /// other batch or row counts, other feature layout, or category values
    /// the first pass never saw.
    pub fn from_source<S: BatchSource + Send + ?Sized>(
        source: &mut S,
        config: &RecodeConfig,
    ) -> Result<Self, CategoryError> {
        config.install(|parallelism| -> Result<Self, CategoryError> {
            source.reset()?;
            let mut builder = SchemaBuilder::new(config.clone());
            while let Some(batch) = source.next_batch()? {
                builder.push_with(&batch, parallelism)?;
            }
            let (n_batches, n_rows) = (builder.n_batches(), builder.n_rows());
            let categories = builder.finish();

            source.reset()?;
            let recoder = own_recoder(&categories, config);
            let mut projected = Vec::with_capacity(n_batches);
            while let Some(batch) = source.next_batch()? {
                let index = projected.len();
                let codes = recoder
                    .project_with(&batch, Projection::Strict, parallelism)
                    .map_err(|err| replay_mismatch(index, err))?;
                projected.push(codes);
            }

            let replayed_rows: usize = projected.iter().map(ProjectedBatch::n_rows).sum();
            if projected.len() != n_batches || replayed_rows != n_rows {
                return Err(SchemaError::BatchSource(format!(
                    "replay yielded {} batches / {} rows, first pass yielded {} / {}",
                    projected.len(),
                    replayed_rows,
                    n_batches,
                    n_rows
                ))
                .into());
            }
            Ok(Self::assemble(categories, projected, config))
        })?
    }

    /// Build against the categories of a reference dataset.
    ///
    /// Every batch is projected strictly: a category the reference never saw
    /// fails the whole construction.
    pub fn with_reference(
        batches: &[Batch],
        reference: &CategoryContainer,
        config: &RecodeConfig,
    ) -> Result<Self, CategoryError> {
        let recoder = Recoder::new(reference.clone(), config.clone());
        let projected = config.install(|parallelism| {
            batches
                .iter()
                .map(|batch| recoder.project_with(batch, Projection::Strict, parallelism))
                .collect::<Result<Vec<_>, _>>()
        })??;
        Ok(Self::assemble(reference.clone(), projected, config))
    }

    fn assemble(
        categories: CategoryContainer,
        batches: Vec<ProjectedBatch>,
        config: &RecodeConfig,
    ) -> Self {
        let n_rows = batches.iter().map(ProjectedBatch::n_rows).sum();
        tracing::debug!(
            n_batches = batches.len(),
            n_rows,
            n_features = categories.n_features(),
            "built encoded dataset"
        );
        Self {
            categories,
            batches,
            n_rows,
            config: config.clone(),
        }
    }

    /// The frozen categorical schema.
    #[inline]
    pub fn categories(&self) -> &CategoryContainer {
        &self.categories
    }

    /// Export handle for the categories.
    pub fn get_categories(&self, export_to_arrow: bool) -> CategoriesExport {
        self.categories.get_categories(export_to_arrow)
    }

    #[inline]
    pub fn batches(&self) -> &[ProjectedBatch] {
        &self.batches
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.categories.n_features()
    }

    /// A recoder for new data against this dataset's categories.
    pub fn recoder(&self) -> Recoder {
        Recoder::new(self.categories.clone(), self.config.clone())
    }

    /// All rows as one feature-major matrix `[n_features, n_rows]`.
    pub fn features(&self) -> Array2<f32> {
        let mut out = Array2::from_elem((self.n_features(), self.n_rows), f32::NAN);
        let mut offset = 0;
        for batch in &self.batches {
            let n = batch.n_rows();
            out.slice_mut(s![.., offset..offset + n])
                .assign(&batch.to_features());
            offset += n;
        }
        out
    }
}

/// Recoder for the data that built `categories`: columns are already in
/// container order.
fn own_recoder(categories: &CategoryContainer, config: &RecodeConfig) -> Recoder {
    let config = RecodeConfig {
        feature_matching: FeatureMatching::Position,
        ..config.clone()
    };
    Recoder::new(categories.clone(), config)
}

fn replay_mismatch(batch: usize, err: CategoryError) -> CategoryError {
    match err {
        CategoryError::Schema(_)
        | CategoryError::TypeMismatch { .. }
        | CategoryError::UnseenCategory { .. } => SchemaError::BatchSource(format!(
            "replayed batch {batch} differs from the first pass: {err}"
        ))
        .into(),
        other => other,
    }
}
