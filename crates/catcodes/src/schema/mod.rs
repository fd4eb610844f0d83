//! Categorical schema: scanning, building, the frozen container and export.
//!
//! A schema assigns each categorical feature a dense code space `0..K`, where
//! code `i` is the `i`-th smallest category value seen during construction.
//! Built once per dataset by [`SchemaBuilder`], then frozen into an immutable
//! [`CategoryContainer`] that every later projection reads from.

mod builder;
mod categories;
mod container;
mod export;
mod scan;

pub use builder::SchemaBuilder;
pub use categories::{Categories, FeatureCategories};
pub use container::CategoryContainer;
pub use export::{CategoriesExport, ExportedFeature};
pub use scan::{ColumnScan, ScannedValues, scan_column};
