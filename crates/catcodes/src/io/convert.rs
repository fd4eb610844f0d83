//! Conversion between [`CategoryContainer`] and its payload.
//!
//! # High-Level API
//!
//! ```
//! use catcodes::{Batch, CategoricalColumn, CategoryContainer, RecodeConfig};
//!
//! let batch = Batch::new(vec![
//!     CategoricalColumn::from_strs(&[Some("cdef"), None, Some("abc")]).into(),
//! ])
//! .unwrap();
//! let categories = CategoryContainer::from_batches(&[batch], &RecodeConfig::default()).unwrap();
//!
//! let bytes = categories.to_bytes().unwrap();
//! let restored = CategoryContainer::from_bytes(&bytes).unwrap();
//! assert_eq!(restored, categories);
//! ```
//!
//! Decoding validates instead of repairing: categories must already be
//! strictly increasing, and nothing is re-sorted.

use std::io::{Read, Write};
use std::path::Path;

use crate::config::MAX_CATEGORIES;
use crate::io::native::{DeserializeError, FormatHeader, NativeCodec, SerializeError};
use crate::io::payload::{CategoriesPayload, CategoriesPayloadV1, FeaturePayload, ValuesPayload};
use crate::schema::{Categories, CategoryContainer, FeatureCategories};
use crate::value::ValueKind;

// ============================================================================
// CategoryContainer Serialization API
// ============================================================================

impl CategoryContainer {
    /// Save to a file in the native binary format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SerializeError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load from a file in the native binary format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to a self-contained byte block, header included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        NativeCodec::new().serialize(self.header()?, &CategoriesPayload::from_container(self))
    }

    /// Deserialize from a byte block produced by [`to_bytes`](Self::to_bytes).
    ///
    /// The slice must hold exactly one block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let (header, payload): (_, CategoriesPayload) = NativeCodec::new().deserialize(bytes)?;
        Self::from_payload(&header, payload)
    }

    /// Write one block to `writer` using `codec`.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        codec: &NativeCodec,
    ) -> Result<(), SerializeError> {
        let mut header = self.header()?;
        let payload = postcard::to_allocvec(&CategoriesPayload::from_container(self))?;
        codec.write_to(writer, &mut header, &payload)
    }

    /// Read one block from `reader`. Bytes after the block are left unread.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, DeserializeError> {
        let (header, bytes) = NativeCodec::new().read_from(reader)?;
        let payload: CategoriesPayload = postcard::from_bytes(&bytes)?;
        Self::from_payload(&header, payload)
    }

    /// The payload as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(
            &CategoriesPayload::from_container(self),
        )?)
    }

    /// Parse the JSON form written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, DeserializeError> {
        let payload: CategoriesPayload = serde_json::from_str(json)?;
        payload.into_container()
    }

    fn header(&self) -> Result<FormatHeader, SerializeError> {
        let count = |what: &'static str, size: usize| {
            u32::try_from(size).map_err(|_| SerializeError::TooLarge { what, size })
        };
        let mut header = FormatHeader::new(
            count("feature count", self.n_features())?,
            count("categorical feature count", self.n_categorical())?,
        );
        for kind in self.iter().flatten().filter_map(FeatureCategories::kind) {
            match kind {
                ValueKind::Int => header.flags.has_int = true,
                ValueKind::Bytes => header.flags.has_bytes = true,
            }
        }
        header.flags.has_feature_names = self.feature_names().is_some();
        Ok(header)
    }

    fn from_payload(
        header: &FormatHeader,
        payload: CategoriesPayload,
    ) -> Result<Self, DeserializeError> {
        let container = payload.into_container()?;
        if header.num_features as usize != container.n_features()
            || header.num_categorical as usize != container.n_categorical()
        {
            return Err(DeserializeError::CorruptPayload(format!(
                "header declares {} features ({} categorical), payload has {} ({})",
                header.num_features,
                header.num_categorical,
                container.n_features(),
                container.n_categorical()
            )));
        }
        tracing::debug!(
            n_features = container.n_features(),
            payload_size = header.payload_size,
            compressed = header.flags.compressed,
            "decoded category block"
        );
        Ok(container)
    }
}

// ============================================================================
// Payload Conversion
// ============================================================================

impl CategoriesPayload {
    /// Create a payload from a container.
    pub fn from_container(container: &CategoryContainer) -> Self {
        let features = container
            .iter()
            .map(|feature| {
                feature.map(|f| FeaturePayload {
                    null_count: f.null_count(),
                    values: ValuesPayload::from(f.categories()),
                })
            })
            .collect();
        CategoriesPayload::V1(CategoriesPayloadV1 {
            feature_names: container.feature_names().map(<[String]>::to_vec),
            features,
        })
    }

    /// Rebuild the container, checking every invariant a frozen container
    /// holds.
    pub fn into_container(self) -> Result<CategoryContainer, DeserializeError> {
        let CategoriesPayload::V1(v1) = self;

        let n_names = v1.feature_names.as_ref().map(Vec::len);
        if n_names.is_some_and(|n| n != v1.features.len()) {
            return Err(DeserializeError::CorruptPayload(format!(
                "{} feature names for {} features",
                n_names.unwrap_or_default(),
                v1.features.len()
            )));
        }

        let features = v1
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| {
                feature
                    .map(|f| -> Result<FeatureCategories, DeserializeError> {
                        let categories = categories_from_payload(f.values).map_err(|msg| {
                            DeserializeError::CorruptPayload(format!("feature {index}: {msg}"))
                        })?;
                        Ok(FeatureCategories::new(categories, f.null_count))
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, DeserializeError>>()?;

        Ok(CategoryContainer::new(features, v1.feature_names))
    }
}

impl From<&Categories> for ValuesPayload {
    fn from(categories: &Categories) -> Self {
        match categories {
            Categories::Empty => ValuesPayload::Empty,
            Categories::Int(values) => ValuesPayload::Int(values.to_vec()),
            Categories::Bytes(values) => {
                let mut offsets = Vec::with_capacity(values.len() + 1);
                let mut data = Vec::with_capacity(values.iter().map(|v| v.len()).sum());
                offsets.push(0);
                for value in values.iter() {
                    data.extend_from_slice(value);
                    offsets.push(data.len() as u64);
                }
                ValuesPayload::Bytes { offsets, data }
            }
        }
    }
}

fn categories_from_payload(values: ValuesPayload) -> Result<Categories, String> {
    if values.len() > MAX_CATEGORIES {
        return Err(format!(
            "{} categories exceed the code space of {MAX_CATEGORIES}",
            values.len()
        ));
    }
    let categories = match values {
        ValuesPayload::Empty => Categories::Empty,
        ValuesPayload::Int(values) => Categories::Int(values.into_boxed_slice()),
        ValuesPayload::Bytes { offsets, data } => Categories::Bytes(unpack_bytes(&offsets, &data)?),
    };
    if !categories.is_strictly_increasing() {
        return Err("categories are not strictly increasing".to_string());
    }
    Ok(categories)
}

fn unpack_bytes(offsets: &[u64], data: &[u8]) -> Result<Box<[Box<[u8]>]>, String> {
    let end = data.len() as u64;
    match (offsets.first().copied(), offsets.last().copied()) {
        (Some(0), Some(last)) if last == end => {}
        _ => {
            return Err(format!(
                "offsets must start at 0 and end at {}",
                data.len()
            ));
        }
    }
    offsets
        .windows(2)
        .map(|w| {
            if w[0] > w[1] || w[1] > end {
                return Err(format!("bad offset pair {}..{}", w[0], w[1]));
            }
            Ok(data[w[0] as usize..w[1] as usize].into())
        })
        .collect()
}
