//! Streaming schema construction.
//!
//! [`SchemaBuilder`] consumes batches one at a time and keeps, per
//! categorical feature, the running sorted set of distinct values plus the
//! missing count. Memory is bounded by the number of distinct categories, not
//! by the number of rows. [`SchemaBuilder::finish`] consumes the builder and
//! hands out the frozen [`CategoryContainer`]; there is no way to observe a
//! half-built container.
//!
//! Codes follow the sorted order of the values, so the result depends only on
//! the set of values seen, never on how the rows were split into batches or
//! in which order the batches arrived.

use std::collections::BTreeSet;

use crate::config::RecodeConfig;
use crate::data::{Batch, FeatureType, describe_type};
use crate::error::{CategoryError, FeatureId, SchemaError};
use crate::utils::Parallelism;
use crate::value::ValueKind;

use super::categories::{Categories, FeatureCategories};
use super::container::CategoryContainer;
use super::scan::{ColumnScan, ScannedValues, scan_column};

// =============================================================================
// Accumulator
// =============================================================================

/// Running distinct values of one categorical feature.
#[derive(Debug, Default)]
enum Accumulator {
    /// No non-empty dictionary seen yet.
    #[default]
    Unknown,
    Int(BTreeSet<i64>),
    Bytes(BTreeSet<Box<[u8]>>),
}

impl Accumulator {
    fn kind(&self) -> Option<ValueKind> {
        match self {
            Accumulator::Unknown => None,
            Accumulator::Int(_) => Some(ValueKind::Int),
            Accumulator::Bytes(_) => Some(ValueKind::Bytes),
        }
    }

    fn len(&self) -> usize {
        match self {
            Accumulator::Unknown => 0,
            Accumulator::Int(set) => set.len(),
            Accumulator::Bytes(set) => set.len(),
        }
    }

    /// Size after merging `values`, without merging.
    fn merged_len(&self, values: &ScannedValues<'_>) -> usize {
        let new = match (self, values) {
            (Accumulator::Int(set), ScannedValues::Int(v)) => {
                v.iter().filter(|x| !set.contains(*x)).count()
            }
            (Accumulator::Bytes(set), ScannedValues::Bytes(v)) => {
                v.iter().filter(|b| !set.contains(**b)).count()
            }
            _ => values.len(),
        };
        self.len() + new
    }

    /// Merge scanned values. Kinds were checked by the caller.
    fn merge(&mut self, values: &ScannedValues<'_>) {
        if values.is_empty() {
            return;
        }
        if matches!(self, Accumulator::Unknown) {
            *self = match values {
                ScannedValues::Int(_) => Accumulator::Int(BTreeSet::new()),
                ScannedValues::Bytes(_) => Accumulator::Bytes(BTreeSet::new()),
            };
        }
        match (self, values) {
            (Accumulator::Int(set), ScannedValues::Int(v)) => set.extend(v.iter().copied()),
            (Accumulator::Bytes(set), ScannedValues::Bytes(v)) => {
                for b in v {
                    if !set.contains(*b) {
                        set.insert(Box::from(*b));
                    }
                }
            }
            (acc, values) => unreachable!(
                "kind checked before merge: {:?} vs {} values",
                acc.kind(),
                values.len()
            ),
        }
    }

    fn freeze(self) -> Categories {
        match self {
            Accumulator::Unknown => Categories::Empty,
            Accumulator::Int(set) => Categories::Int(set.into_iter().collect()),
            Accumulator::Bytes(set) => Categories::Bytes(set.into_iter().collect()),
        }
    }
}

#[derive(Debug, Default)]
struct FeatureAccumulator {
    values: Accumulator,
    /// Kind of the first non-empty dictionary, even if no row referenced it.
    kind: Option<ValueKind>,
    null_count: u64,
}

type Accumulators = Vec<Option<FeatureAccumulator>>;

// =============================================================================
// SchemaBuilder
// =============================================================================

/// Builds a [`CategoryContainer`] from a stream of batches.
///
/// Every [`push`](Self::push) either merges the whole batch or, on error,
/// leaves the builder exactly as it was.
///
/// # Example
///
/// ```
/// use catcodes::{Batch, CategoricalColumn, RecodeConfig, SchemaBuilder};
///
/// let batch = Batch::new(vec![
///     CategoricalColumn::from_strs(&[Some("cdef"), None, Some("abc"), Some("abc")]).into(),
/// ])
/// .unwrap();
///
/// let mut builder = SchemaBuilder::new(RecodeConfig::default());
/// builder.push(&batch).unwrap();
/// let container = builder.finish();
///
/// let feature = container.feature(0).unwrap();
/// assert_eq!(feature.len(), 2);
/// assert_eq!(feature.null_count(), 1);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    config: RecodeConfig,
    /// Declared by the caller, or taken from the first batch.
    feature_types: Option<Vec<FeatureType>>,
    types_declared: bool,
    feature_names: Option<Vec<String>>,
    /// One slot per feature; `None` for numeric features.
    features: Accumulators,
    n_batches: usize,
    n_rows: usize,
}

impl SchemaBuilder {
    pub fn new(config: RecodeConfig) -> Self {
        Self {
            config,
            feature_types: None,
            types_declared: false,
            feature_names: None,
            features: Vec::new(),
            n_batches: 0,
            n_rows: 0,
        }
    }

    /// Declare the feature types up front. Every batch is then checked
    /// against them instead of against the first batch.
    pub fn with_feature_types(mut self, types: Vec<FeatureType>) -> Self {
        self.features = types
            .iter()
            .map(|t| t.is_categorical().then(FeatureAccumulator::default))
            .collect();
        self.feature_types = Some(types);
        self.types_declared = true;
        self
    }

    /// Declare feature names up front.
    pub fn with_feature_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.feature_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Number of batches merged so far.
    #[inline]
    pub fn n_batches(&self) -> usize {
        self.n_batches
    }

    /// Number of rows merged so far.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Merge one batch.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::FeatureCountMismatch`] if the batch has a different
    ///   number of features than earlier batches (or the declared types).
    /// - [`SchemaError::InconsistentFeatureType`] if a feature changes between
    ///   numeric and categorical across batches.
    /// - [`CategoryError::TypeMismatch`] if a column disagrees with the
    ///   declared feature types.
    /// - [`SchemaError::FeatureNameMismatch`] if the batch names its features
    ///   differently.
    /// - [`SchemaError::InconsistentValueKind`] if a feature mixes integer and
    ///   byte dictionaries.
    /// - [`SchemaError::TooManyCategories`] if a feature would exceed
    ///   `max_categories`.
    pub fn push(&mut self, batch: &Batch) -> Result<(), CategoryError> {
        let config = self.config.clone();
        config.install(|parallelism| self.push_with(batch, parallelism))?
    }

    /// [`push`](Self::push) on an already-installed thread pool.
    pub(crate) fn push_with(
        &mut self,
        batch: &Batch,
        parallelism: Parallelism,
    ) -> Result<(), CategoryError> {
        let first = self.check_structure(batch)?;

        let scans: Vec<Option<ColumnScan<'_>>> =
            parallelism.maybe_par_map(batch.columns(), |column| {
                column.as_categorical().map(scan_column)
            });

        let features = first.as_deref().unwrap_or(self.features.as_slice());
        self.check_scans(batch, features, &scans)?;
        if let Some(first) = first {
            self.features = first;
        }

        for (acc, scan) in self.features.iter_mut().zip(&scans) {
            if let (Some(acc), Some(scan)) = (acc.as_mut(), scan) {
                if acc.kind.is_none() {
                    acc.kind = scan.kind();
                }
                acc.values.merge(scan.values());
                acc.null_count += scan.null_count();
            }
        }

        if self.feature_types.is_none() {
            self.feature_types = Some(batch.feature_types());
        }
        if self.feature_names.is_none() {
            self.feature_names = batch.feature_names().map(<[String]>::to_vec);
        }
        self.n_batches += 1;
        self.n_rows += batch.n_rows();

        tracing::trace!(
            batch = self.n_batches - 1,
            n_rows = batch.n_rows(),
            "merged batch into categorical schema"
        );
        Ok(())
    }

    /// Feature count, feature types and names. Touches nothing.
    ///
    /// For the first batch without declared types, returns the empty
    /// accumulators the batch defines.
    fn check_structure(&self, batch: &Batch) -> Result<Option<Accumulators>, CategoryError> {
        let Some(types) = &self.feature_types else {
            if let Some(names) = &self.feature_names {
                if names.len() != batch.n_features() {
                    return Err(SchemaError::FeatureCountMismatch {
                        expected: names.len(),
                        found: batch.n_features(),
                    }
                    .into());
                }
                check_names(names, batch)?;
            }
            return Ok(Some(
                batch
                    .columns()
                    .iter()
                    .map(|c| c.feature_type().is_categorical().then(FeatureAccumulator::default))
                    .collect(),
            ));
        };

        if types.len() != batch.n_features() {
            return Err(SchemaError::FeatureCountMismatch {
                expected: types.len(),
                found: batch.n_features(),
            }
            .into());
        }
        if self.types_declared {
            batch.check_feature_types(types)?;
        } else {
            for (feature, (column, expected)) in batch.columns().iter().zip(types).enumerate() {
                if column.feature_type() != *expected {
                    return Err(SchemaError::InconsistentFeatureType {
                        feature: self.feature_id(batch, feature),
                        expected: describe_type(*expected).to_string(),
                        found: describe_type(column.feature_type()).to_string(),
                    }
                    .into());
                }
            }
        }
        if let Some(names) = &self.feature_names {
            check_names(names, batch)?;
        }
        Ok(None)
    }

    /// Value kinds and category caps. Touches nothing.
    fn check_scans(
        &self,
        batch: &Batch,
        features: &[Option<FeatureAccumulator>],
        scans: &[Option<ColumnScan<'_>>],
    ) -> Result<(), CategoryError> {
        for (feature, (acc, scan)) in features.iter().zip(scans).enumerate() {
            let (Some(acc), Some(scan)) = (acc, scan) else {
                continue;
            };
            if let (Some(expected), Some(found)) = (acc.kind, scan.kind()) {
                if expected != found {
                    return Err(SchemaError::InconsistentValueKind {
                        feature: self.feature_id(batch, feature),
                        expected,
                        found,
                    }
                    .into());
                }
            }
            let count = acc.values.merged_len(scan.values());
            if count > self.config.max_categories {
                return Err(SchemaError::TooManyCategories {
                    feature: self.feature_id(batch, feature),
                    count,
                    max: self.config.max_categories,
                }
                .into());
            }
        }
        Ok(())
    }

    fn feature_id(&self, batch: &Batch, feature: usize) -> FeatureId {
        match self.feature_names.as_ref().and_then(|n| n.get(feature)) {
            Some(name) => FeatureId::named(feature, name.clone()),
            None => batch.feature_id(feature),
        }
    }

    /// Freeze the accumulated schema.
    ///
    /// Without any batch, the declared feature types (if any) define the
    /// features and every categorical feature is empty.
    pub fn finish(self) -> CategoryContainer {
        let feature_names = self
            .feature_names
            .filter(|names| names.len() == self.features.len());
        let features: Vec<Option<FeatureCategories>> = self
            .features
            .into_iter()
            .map(|acc| acc.map(|acc| FeatureCategories::new(acc.values.freeze(), acc.null_count)))
            .collect();
        let container = CategoryContainer::new(features, feature_names);

        tracing::debug!(
            n_features = container.n_features(),
            n_categorical = container.n_categorical(),
            n_categories = container.total_categories(),
            n_batches = self.n_batches,
            "froze categorical schema"
        );
        container
    }
}

fn check_names(expected: &[String], batch: &Batch) -> Result<(), SchemaError> {
    let Some(found) = batch.feature_names() else {
        return Ok(());
    };
    if expected.len() != found.len() {
        return Err(SchemaError::FeatureCountMismatch {
            expected: expected.len(),
            found: found.len(),
        });
    }
    match expected.iter().zip(found).position(|(e, f)| e != f) {
        Some(index) => Err(SchemaError::FeatureNameMismatch {
            index,
            expected: expected[index].clone(),
            found: found[index].clone(),
        }),
        None => Ok(()),
    }
}

impl CategoryContainer {
    /// Build a container from in-memory batches.
    pub fn from_batches(batches: &[Batch], config: &RecodeConfig) -> Result<Self, CategoryError> {
        let mut builder = SchemaBuilder::new(config.clone());
        config.install(|parallelism| {
            batches
                .iter()
                .try_for_each(|batch| builder.push_with(batch, parallelism))
        })??;
        Ok(builder.finish())
    }
}
