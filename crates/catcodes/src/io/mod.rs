//! Persistence of category containers.
//!
//! - [`native`]: the framed binary block (header, checksum, optional zstd).
//! - [`payload`]: the versioned payload inside a block, also used for JSON.
//! - [`convert`]: `save`/`load`/`to_bytes`/`from_bytes`/`to_json`/`from_json`
//!   on [`CategoryContainer`](crate::CategoryContainer).
//!
//! # Feature Flags
//!
//! - `storage-compression`: zstd compression of large payloads

pub mod convert;
pub mod native;
pub mod payload;

pub use native::{
    CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR, DeserializeError, FormatFlags, FormatHeader,
    HEADER_SIZE, MAGIC, NativeCodec, SerializeError,
};
pub use payload::{CategoriesPayload, CategoriesPayloadV1, FeaturePayload, ValuesPayload};
