//! Projection of data onto a frozen categorical schema.
//!
//! - [`project_column`]: one column against one feature's categories.
//! - [`Recoder`]: a whole batch against a container, with feature matching
//!   and type checks.
//! - [`EncodedDataset`]: a data matrix that owns its container and codes.

mod dataset;
mod project;
mod recoder;

pub use dataset::EncodedDataset;
pub use project::{CodeBuffer, MISSING_CODE, Projection, project_column};
pub use recoder::{ProjectedBatch, ProjectedColumn, Recoder};
