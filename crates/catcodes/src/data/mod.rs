//! Input data: columns, batches and batch sources.
//!
//! This is the boundary with frame adapters. A frame adapter hands over, per
//! batch and per feature, either a numeric column or a categorical column
//! made of a [`Dictionary`] plus per-row local codes. Whether a feature is
//! categorical is decided by the caller, never inferred.
//!
//! # Missing Values
//!
//! Numeric columns use `f32::NAN`. Categorical columns use any negative
//! local code.

mod batch;
mod column;
mod record_batches;

pub use batch::{Batch, BatchSource, InMemorySource};
pub use column::{CategoricalColumn, Column, Dictionary, FeatureType};

pub(crate) use batch::describe_type;
