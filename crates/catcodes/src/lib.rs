//! catcodes: canonical ordinal codes for categorical features.
//!
//! Frames number their categories however they like. A model trained on one
//! frame and applied to another only behaves the same if both agree on what
//! code `3` means. This crate fixes that meaning once per training dataset
//! and projects every later dataset onto it by value.
//!
//! # Key Types
//!
//! - [`Batch`] / [`CategoricalColumn`] - Input data with per-batch dictionaries
//! - [`SchemaBuilder`] - Accumulates categories across batches
//! - [`CategoryContainer`] - The frozen, shareable schema
//! - [`Recoder`] - Strict projection of new data onto a container
//! - [`EncodedDataset`] - A data matrix that owns its container and codes
//! - [`RecodeConfig`] - Configuration builder
//!
//! # Example
//!
//! ```
//! use catcodes::{Batch, CategoricalColumn, CategoryError, EncodedDataset, RecodeConfig};
//!
//! let config = RecodeConfig::default();
//! let train = Batch::new(vec![
//!     CategoricalColumn::from_strs(&[Some("cdef"), None, Some("abc"), Some("abc")]).into(),
//! ])
//! .unwrap();
//! let train = EncodedDataset::from_batches(&[train], &config).unwrap();
//!
//! let feature = train.categories().feature(0).unwrap();
//! assert_eq!(feature.len(), 2);
//! assert_eq!(feature.null_count(), 1);
//!
//! let unseen = Batch::new(vec![CategoricalColumn::from_strs(&[Some("def")]).into()]).unwrap();
//! let err = train.recoder().project(&unseen).unwrap_err();
//! assert!(matches!(err, CategoryError::UnseenCategory { .. }));
//! ```
//!
//! # Persistence
//!
//! [`CategoryContainer::save`] / [`CategoryContainer::load`] use the native
//! binary block described in [`io::native`]. See the [`io`] module.

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod recode;
pub mod schema;
pub mod testing;
pub mod utils;
pub mod value;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Configuration
pub use config::{ConfigError, FeatureMatching, MAX_CATEGORIES, RecodeConfig};

// Input data
pub use data::{Batch, BatchSource, CategoricalColumn, Column, Dictionary, FeatureType, InMemorySource};

// Errors
pub use error::{CategoryError, FeatureId, SchemaError};

// Schema
pub use schema::{
    Categories, CategoriesExport, CategoryContainer, ExportedFeature, FeatureCategories,
    SchemaBuilder,
};

// Projection
pub use recode::{
    CodeBuffer, EncodedDataset, MISSING_CODE, ProjectedBatch, ProjectedColumn, Projection,
    Recoder,
};

// Persistence
pub use io::{DeserializeError, NativeCodec, SerializeError};

// Values
pub use value::{CategoryRef, CategoryValue, ValueKind};

// Shared utilities
pub use utils::{Parallelism, run_with_threads};
