//! Batch-level re-encoding against a frozen container.

use ndarray::Array2;

use crate::config::{FeatureMatching, RecodeConfig};
use crate::data::{Batch, Column};
use crate::error::{CategoryError, SchemaError};
use crate::schema::CategoryContainer;
use crate::utils::Parallelism;

use super::project::{CodeBuffer, MISSING_CODE, Projection, check_kind, project_column};

// =============================================================================
// Projected output
// =============================================================================

/// One projected feature column.
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectedColumn {
    /// Numeric values, passed through unchanged.
    Numeric(Box<[f32]>),
    /// Canonical category codes.
    Codes(CodeBuffer),
}

impl ProjectedColumn {
    pub fn len(&self) -> usize {
        match self {
            ProjectedColumn::Numeric(v) => v.len(),
            ProjectedColumn::Codes(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_codes(&self) -> Option<&CodeBuffer> {
        match self {
            ProjectedColumn::Codes(c) => Some(c),
            ProjectedColumn::Numeric(_) => None,
        }
    }

    /// Value of row `row` as a float: codes become floats, missing is `NaN`.
    #[inline]
    pub fn value(&self, row: usize) -> f32 {
        match self {
            ProjectedColumn::Numeric(v) => v[row],
            ProjectedColumn::Codes(c) => code_to_f32(c.as_slice()[row]),
        }
    }
}

#[inline]
fn code_to_f32(code: i32) -> f32 {
    if code == MISSING_CODE {
        f32::NAN
    } else {
        code as f32
    }
}

/// A batch projected onto a container's code space, in container feature order.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedBatch {
    columns: Vec<ProjectedColumn>,
    n_rows: usize,
}

impl ProjectedBatch {
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn columns(&self) -> &[ProjectedColumn] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, feature: usize) -> Option<&ProjectedColumn> {
        self.columns.get(feature)
    }

    /// Codes of a categorical feature.
    #[inline]
    pub fn codes(&self, feature: usize) -> Option<&CodeBuffer> {
        self.columns.get(feature)?.as_codes()
    }

    /// Feature-major matrix `[n_features, n_rows]`.
    ///
    /// Categorical features hold their canonical codes as floats; missing
    /// values are `NaN` in both kinds of feature.
    pub fn to_features(&self) -> Array2<f32> {
        let mut out = Array2::from_elem((self.n_features(), self.n_rows), f32::NAN);
        for (mut row, column) in out.rows_mut().into_iter().zip(&self.columns) {
            match column {
                ProjectedColumn::Numeric(v) => {
                    row.iter_mut().zip(v.iter()).for_each(|(o, &x)| *o = x);
                }
                ProjectedColumn::Codes(c) => {
                    row.iter_mut()
                        .zip(c.as_slice())
                        .for_each(|(o, &code)| *o = code_to_f32(code));
                }
            }
        }
        out
    }
}

// =============================================================================
// Recoder
// =============================================================================

/// Re-encodes incoming batches against a frozen container.
///
/// This is the path prediction, validation-set evaluation and any other
/// query on foreign data go through. Per batch it:
///
/// 1. matches the batch's columns to the container's features (by position
///    or by name, see [`FeatureMatching`]);
/// 2. checks every feature's type against the container before any value
///    lookup;
/// 3. projects categorical columns by value and passes numeric columns
///    through.
///
/// A `Recoder` only reads its container, so one instance can serve any
/// number of threads. Each call allocates its own output.
#[derive(Clone, Debug)]
pub struct Recoder {
    container: CategoryContainer,
    config: RecodeConfig,
}

impl Recoder {
    pub fn new(container: CategoryContainer, config: RecodeConfig) -> Self {
        Self { container, config }
    }

    #[inline]
    pub fn container(&self) -> &CategoryContainer {
        &self.container
    }

    #[inline]
    pub fn config(&self) -> &RecodeConfig {
        &self.config
    }

    /// Strictly project a batch. See [`project_batch`](Self::project_batch).
    pub fn project(&self, batch: &Batch) -> Result<ProjectedBatch, CategoryError> {
        self.project_batch(batch, Projection::Strict)
    }

    /// Project a batch onto the container's code space.
    ///
    /// # Errors
    ///
    /// - [`SchemaError`] if the features do not line up with the container:
    ///   count, names, or (with name matching) missing names.
    /// - [`CategoryError::TypeMismatch`] if a feature is numeric on one side
    ///   and categorical on the other, or holds the other value kind.
    /// - [`CategoryError::UnseenCategory`] (strict mode) for a value the
    ///   container does not know.
    ///
    /// Either the whole batch projects or an error is returned.
    pub fn project_batch(
        &self,
        batch: &Batch,
        mode: Projection,
    ) -> Result<ProjectedBatch, CategoryError> {
        self.config
            .install(|parallelism| self.project_with(batch, mode, parallelism))?
    }

    /// Check that a batch would project, without any value lookup.
    pub fn validate(&self, batch: &Batch) -> Result<(), CategoryError> {
        let columns = self.align(batch)?;
        self.check_types(&columns)
    }

    pub(crate) fn project_with(
        &self,
        batch: &Batch,
        mode: Projection,
        parallelism: Parallelism,
    ) -> Result<ProjectedBatch, CategoryError> {
        let columns = self.align(batch)?;
        self.check_types(&columns)?;

        let projected = parallelism.maybe_par_try_map(
            columns.into_iter().enumerate().collect::<Vec<_>>(),
            |(feature, column)| match (self.container.feature(feature), column) {
                (Some(schema), Column::Categorical(c)) => {
                    let id = self.container.feature_id(feature);
                    project_column(schema, c, mode, &id).map(ProjectedColumn::Codes)
                }
                (None, Column::Numeric(v)) => {
                    Ok(ProjectedColumn::Numeric(v.clone().into_boxed_slice()))
                }
                _ => unreachable!("feature types checked before projection"),
            },
        )?;

        Ok(ProjectedBatch {
            columns: projected,
            n_rows: batch.n_rows(),
        })
    }

    /// The batch's columns in container feature order.
    fn align<'b>(&self, batch: &'b Batch) -> Result<Vec<&'b Column>, CategoryError> {
        let expected = self.container.n_features();
        match self.config.feature_matching {
            FeatureMatching::Position => {
                if batch.n_features() != expected {
                    return Err(SchemaError::FeatureCountMismatch {
                        expected,
                        found: batch.n_features(),
                    }
                    .into());
                }
                if let (Some(ours), Some(theirs)) =
                    (self.container.feature_names(), batch.feature_names())
                {
                    if let Some(index) = ours.iter().zip(theirs).position(|(a, b)| a != b) {
                        return Err(SchemaError::FeatureNameMismatch {
                            index,
                            expected: ours[index].clone(),
                            found: theirs[index].clone(),
                        }
                        .into());
                    }
                }
                Ok(batch.columns().iter().collect())
            }
            FeatureMatching::Name => {
                let (Some(ours), Some(theirs)) =
                    (self.container.feature_names(), batch.feature_names())
                else {
                    return Err(SchemaError::FeatureNamesRequired.into());
                };
                let columns = ours
                    .iter()
                    .map(|name| {
                        theirs
                            .iter()
                            .position(|n| n == name)
                            .map(|i| &batch.columns()[i])
                            .ok_or_else(|| SchemaError::MissingFeatureName { name: name.clone() })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if batch.n_features() != expected {
                    return Err(SchemaError::FeatureCountMismatch {
                        expected,
                        found: batch.n_features(),
                    }
                    .into());
                }
                Ok(columns)
            }
        }
    }

    /// Categorical vs numeric, and value kind, for every feature.
    fn check_types(&self, columns: &[&Column]) -> Result<(), CategoryError> {
        for (feature, column) in columns.iter().enumerate() {
            match (self.container.feature(feature), column) {
                (Some(schema), Column::Categorical(c)) => {
                    check_kind(schema, c.dictionary(), &self.container.feature_id(feature))?;
                }
                (None, Column::Numeric(_)) => {}
                (schema, column) => {
                    return Err(CategoryError::TypeMismatch {
                        feature: self.container.feature_id(feature),
                        expected: schema.map_or_else(|| "numeric".to_string(), |s| s.describe()),
                        found: column.describe(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl CategoryContainer {
    /// Project a batch onto this container's code space by position.
    ///
    /// `strict = false` is only for data that built this container; see
    /// [`Projection::Trusted`].
    pub fn project(&self, batch: &Batch, strict: bool) -> Result<ProjectedBatch, CategoryError> {
        Recoder::new(self.clone(), RecodeConfig::default())
            .project_batch(batch, Projection::from_strict(strict))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::data::CategoricalColumn;
    use crate::value::CategoryValue;

    fn train() -> CategoryContainer {
        let batch = Batch::new(vec![
            Column::Numeric(vec![0.5, 1.5]),
            CategoricalColumn::from_strs(&[Some("cdef"), Some("abc")]).into(),
        ])
        .unwrap()
        .with_feature_names(["x", "c"])
        .unwrap();
        CategoryContainer::from_batches(&[batch], &RecodeConfig::default()).unwrap()
    }

    fn incoming(values: &[Option<&str>]) -> Batch {
        let x = vec![1.0f32; values.len()];
        Batch::new(vec![x.into(), CategoricalColumn::from_strs(values).into()]).unwrap()
    }

    #[rstest]
    #[case(&[Some("abc"), Some("cdef")], &[0, 1])]
    #[case(&[Some("cdef"), Some("abc")], &[1, 0])]
    #[case(&[None, Some("cdef")], &[MISSING_CODE, 1])]
    fn projects_by_value(#[case] values: &[Option<&str>], #[case] expected: &[i32]) {
        let projected = train().project(&incoming(values), true).unwrap();
        assert_eq!(projected.codes(1).unwrap().as_slice(), expected);
        let x = ProjectedColumn::Numeric(vec![1.0f32; values.len()].into_boxed_slice());
        assert_eq!(projected.column(0), Some(&x));
    }

    #[test]
    fn unseen_category_fails_whole_batch() {
        let err = train()
            .project(&incoming(&[Some("abc"), Some("def")]), true)
            .unwrap_err();
        match err {
            CategoryError::UnseenCategory { feature, value } => {
                assert_eq!(feature.name.as_deref(), Some("c"));
                assert_eq!(value, CategoryValue::from("def"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_where_categorical_expected() {
        let batch = Batch::new(vec![
            Column::Numeric(vec![1.0]),
            Column::Numeric(vec![2.0]),
        ])
        .unwrap();
        let err = train().project(&batch, true).unwrap_err();
        assert!(err.to_string().contains("data type doesn't match"));
    }

    #[test]
    fn categorical_where_numeric_expected() {
        let batch = Batch::new(vec![
            CategoricalColumn::from_strs(&[Some("abc")]).into(),
            CategoricalColumn::from_strs(&[Some("abc")]).into(),
        ])
        .unwrap();
        let err = train().project(&batch, true).unwrap_err();
        assert!(matches!(err, CategoryError::TypeMismatch { ref feature, .. } if feature.index == 0));
    }

    #[test]
    fn type_checked_before_lookup() {
        // Feature 1 holds an unseen value, feature 0 has the wrong type; the
        // type error must win.
        let batch = Batch::new(vec![
            CategoricalColumn::from_strs(&[Some("x")]).into(),
            CategoricalColumn::from_strs(&[Some("zzz")]).into(),
        ])
        .unwrap();
        let err = train().project(&batch, true).unwrap_err();
        assert!(matches!(err, CategoryError::TypeMismatch { .. }));
    }

    #[test]
    fn feature_count_mismatch() {
        let batch = Batch::new(vec![Column::Numeric(vec![1.0])]).unwrap();
        let err = train().project(&batch, true).unwrap_err();
        assert_eq!(
            err,
            CategoryError::Schema(SchemaError::FeatureCountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn positional_name_mismatch() {
        let batch = incoming(&[Some("abc")]).with_feature_names(["c", "x"]).unwrap();
        let err = train().project(&batch, true).unwrap_err();
        assert!(matches!(
            err,
            CategoryError::Schema(SchemaError::FeatureNameMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn match_by_name_reorders() {
        let config = RecodeConfig::builder()
            .feature_matching(FeatureMatching::Name)
            .build()
            .unwrap();
        let recoder = Recoder::new(train(), config);
        let batch = Batch::new(vec![
            CategoricalColumn::from_strs(&[Some("cdef")]).into(),
            Column::Numeric(vec![7.0]),
        ])
        .unwrap()
        .with_feature_names(["c", "x"])
        .unwrap();

        let projected = recoder.project(&batch).unwrap();
        assert_eq!(projected.codes(1).unwrap().as_slice(), &[1]);
        assert_eq!(projected.to_features()[[0, 0]], 7.0);
    }

    #[test]
    fn match_by_name_requires_names() {
        let config = RecodeConfig::builder()
            .feature_matching(FeatureMatching::Name)
            .build()
            .unwrap();
        let err = Recoder::new(train(), config)
            .project(&incoming(&[Some("abc")]))
            .unwrap_err();
        assert_eq!(err, CategoryError::Schema(SchemaError::FeatureNamesRequired));
    }

    #[test]
    fn match_by_name_missing_feature() {
        let config = RecodeConfig::builder()
            .feature_matching(FeatureMatching::Name)
            .build()
            .unwrap();
        let batch = incoming(&[Some("abc")]).with_feature_names(["x", "color"]).unwrap();
        let err = Recoder::new(train(), config).project(&batch).unwrap_err();
        assert_eq!(
            err,
            CategoryError::Schema(SchemaError::MissingFeatureName { name: "c".into() })
        );
    }

    #[test]
    fn features_matrix_is_feature_major() {
        let projected = train()
            .project(&incoming(&[Some("cdef"), None, Some("abc")]), true)
            .unwrap();
        let features = projected.to_features();
        assert_eq!(features.shape(), &[2, 3]);
        assert_eq!(features[[1, 0]], 1.0);
        assert!(features[[1, 1]].is_nan());
        assert_eq!(features[[1, 2]], 0.0);
    }

    #[test]
    fn validate_checks_without_lookup() {
        let recoder = Recoder::new(train(), RecodeConfig::default());
        assert!(recoder.validate(&incoming(&[Some("unseen")])).is_ok());
    }
}
