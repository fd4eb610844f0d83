//! Batches of feature columns and the external-memory batch source.

use crate::error::{CategoryError, FeatureId, SchemaError};

use super::column::{Column, FeatureType};

/// One batch of rows: a column per feature, all the same length.
///
/// A dataset may arrive as many batches (external memory, streaming). Each
/// batch carries its own category dictionaries.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    columns: Vec<Column>,
    feature_names: Option<Vec<String>>,
    n_rows: usize,
}

impl Batch {
    /// Create a batch from columns in feature order.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RowCountMismatch`] if the columns differ in length.
    pub fn new(columns: Vec<Column>) -> Result<Self, SchemaError> {
        let n_rows = columns.first().map_or(0, Column::len);
        for (feature, column) in columns.iter().enumerate() {
            if column.len() != n_rows {
                return Err(SchemaError::RowCountMismatch {
                    feature,
                    expected: n_rows,
                    found: column.len(),
                });
            }
        }
        Ok(Self {
            columns,
            feature_names: None,
            n_rows,
        })
    }

    /// Attach feature names, one per column.
    pub fn with_feature_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self, SchemaError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.columns.len() {
            return Err(SchemaError::FeatureCountMismatch {
                expected: self.columns.len(),
                found: names.len(),
            });
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, feature: usize) -> Option<&Column> {
        self.columns.get(feature)
    }

    #[inline]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Identify a feature for error messages.
    pub fn feature_id(&self, feature: usize) -> FeatureId {
        match self.feature_names.as_ref().and_then(|n| n.get(feature)) {
            Some(name) => FeatureId::named(feature, name.clone()),
            None => FeatureId::index(feature),
        }
    }

    /// Feature types as presented by the columns.
    pub fn feature_types(&self) -> Vec<FeatureType> {
        self.columns.iter().map(Column::feature_type).collect()
    }

    /// Check the columns against caller-declared feature types.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::FeatureCountMismatch`] if the lengths differ.
    /// - [`CategoryError::TypeMismatch`] naming the first disagreeing feature.
    pub fn check_feature_types(&self, types: &[FeatureType]) -> Result<(), CategoryError> {
        if types.len() != self.columns.len() {
            return Err(SchemaError::FeatureCountMismatch {
                expected: types.len(),
                found: self.columns.len(),
            }
            .into());
        }
        for (feature, (column, declared)) in self.columns.iter().zip(types).enumerate() {
            if column.feature_type() != *declared {
                return Err(CategoryError::TypeMismatch {
                    feature: self.feature_id(feature),
                    expected: describe_type(*declared).to_string(),
                    found: column.describe(),
                });
            }
        }
        Ok(())
    }

    /// Rows `start..end` as a new batch.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice_rows(&self, start: usize, end: usize) -> Batch {
        assert!(start <= end && end <= self.n_rows, "row range out of bounds");
        Batch {
            columns: self.columns.iter().map(|c| c.slice(start, end)).collect(),
            feature_names: self.feature_names.clone(),
            n_rows: end - start,
        }
    }
}

pub(crate) fn describe_type(ft: FeatureType) -> &'static str {
    match ft {
        FeatureType::Numeric => "numeric",
        FeatureType::Categorical => "categorical",
    }
}

// =============================================================================
// Batch sources
// =============================================================================

/// A resettable stream of batches, e.g. an external-memory iterator.
///
/// Batches must come out in the same order after every [`reset`](Self::reset).
/// Building a dataset from a source walks it twice: once to build the schema,
/// once to project codes.
pub trait BatchSource {
    /// Rewind to the first batch.
    fn reset(&mut self) -> Result<(), CategoryError>;

    /// The next batch, or `None` when exhausted.
    fn next_batch(&mut self) -> Result<Option<Batch>, CategoryError>;
}

/// A [`BatchSource`] over batches already in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    batches: Vec<Batch>,
    position: usize,
}

impl InMemorySource {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self {
            batches,
            position: 0,
        }
    }
}

impl BatchSource for InMemorySource {
    fn reset(&mut self) -> Result<(), CategoryError> {
        self.position = 0;
        Ok(())
    }

    fn next_batch(&mut self) -> Result<Option<Batch>, CategoryError> {
        let batch = self.batches.get(self.position).cloned();
        if batch.is_some() {
            self.position += 1;
        }
        Ok(batch)
    }
}
