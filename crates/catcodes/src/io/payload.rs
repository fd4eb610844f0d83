//! Payload structures for category block serialization.
//!
//! The payload is what sits after the header: Postcard-encoded in binary
//! blocks, plain JSON for inspection. Byte categories are stored packed
//! (one data buffer plus offsets) rather than as a list of lists.

use serde::{Deserialize, Serialize};

/// Top-level payload, tagged by version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoriesPayload {
    V1(CategoriesPayloadV1),
}

/// Version 1 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesPayloadV1 {
    /// Feature names, one per feature, when the container has them.
    pub feature_names: Option<Vec<String>>,
    /// One entry per feature; `None` for numeric features.
    pub features: Vec<Option<FeaturePayload>>,
}

/// Schema of one categorical feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePayload {
    /// Missing entries seen while building.
    pub null_count: u64,
    /// Sorted categories.
    pub values: ValuesPayload,
}

/// Sorted category values of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuesPayload {
    /// No values and no known kind.
    Empty,
    Int(Vec<i64>),
    /// Category `i` is `data[offsets[i]..offsets[i + 1]]`.
    Bytes { offsets: Vec<u64>, data: Vec<u8> },
}

impl ValuesPayload {
    /// Number of categories, as stored.
    pub fn len(&self) -> usize {
        match self {
            ValuesPayload::Empty => 0,
            ValuesPayload::Int(v) => v.len(),
            ValuesPayload::Bytes { offsets, .. } => offsets.len().saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
