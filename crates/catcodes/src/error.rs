//! Error types shared by schema construction, projection and export.
//!
//! Codec errors live next to the codec in [`crate::io`].

use std::fmt;

use crate::config::ConfigError;
use crate::value::{CategoryValue, ValueKind};

/// Identifies a feature in error messages: its position and, when known, its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureId {
    /// Position of the feature in column order.
    pub index: usize,
    /// Feature name, if the data carried names.
    pub name: Option<String>,
}

impl FeatureId {
    /// A feature known only by position.
    pub fn index(index: usize) -> Self {
        Self { index, name: None }
    }

    /// A feature with a name.
    pub fn named(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "`{}` (#{})", name, self.index),
            None => write!(f, "#{}", self.index),
        }
    }
}

/// Structural problems with the data: inconsistent batches, feature-set
/// mismatches, malformed columns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("feature {feature} mixes {expected} and {found} category values across batches")]
    InconsistentValueKind {
        feature: FeatureId,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("feature {feature} changes type across batches: expected {expected}, got {found}")]
    InconsistentFeatureType {
        feature: FeatureId,
        expected: String,
        found: String,
    },

    #[error("feature count mismatch: expected {expected}, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("feature name mismatch at #{index}: expected `{expected}`, got `{found}`")]
    FeatureNameMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("feature `{name}` is missing from the data")]
    MissingFeatureName { name: String },

    #[error("matching features by name requires feature names on both the schema and the data")]
    FeatureNamesRequired,

    #[error("row count mismatch for feature #{feature}: expected {expected}, got {found}")]
    RowCountMismatch {
        feature: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has category code {code}, but the dictionary only has {dictionary_len} entries")]
    InvalidCode {
        row: usize,
        code: i32,
        dictionary_len: usize,
    },

    #[error("feature {feature} has {count} categories, more than the maximum of {max}")]
    TooManyCategories {
        feature: FeatureId,
        count: usize,
        max: usize,
    },

    #[error("unknown feature type `{0}`, expected one of {{int, float, i, q, c}}")]
    UnknownFeatureType(String),

    #[error("unsupported column `{column}` of type {data_type}")]
    UnsupportedColumn { column: String, data_type: String },

    #[error("batch source failed: {0}")]
    BatchSource(String),
}

/// Errors raised by the categorical re-coding subsystem.
///
/// All of them are raised at the point of detection and abort the whole
/// call; there is no partial output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CategoryError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("The data type doesn't match for feature {feature}: expected {expected}, got {found}")]
    TypeMismatch {
        feature: FeatureId,
        expected: String,
        found: String,
    },

    #[error("Found a category not in the training set for feature {feature}: {value}")]
    UnseenCategory {
        feature: FeatureId,
        value: CategoryValue,
    },

    #[error("categories are not exported; request them with `export_to_arrow = true`")]
    ExportDisabled,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
