//! Native binary framing for category blocks.
//!
//! A block is a 32-byte header followed by a Postcard-encoded payload.
//!
//! # Format Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Header (32 bytes)                        │
//! ├────────────────────────────────────────────────────────────┤
//! │                    Payload (variable)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payload checksum covers the bytes as stored (after compression).

use std::io::{Read, Write};

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a category block.
pub const MAGIC: &[u8; 4] = b"BCAT";

/// Current format version (major). Readers reject newer majors.
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor). Newer minors are read with a warning.
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Minimum payload size for auto-compression (32KB).
#[cfg(feature = "storage-compression")]
pub const COMPRESSION_THRESHOLD: usize = 32 * 1024;

// ============================================================================
// Format Flags
// ============================================================================

/// Flags stored in header bytes 8..10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags {
    /// Payload is compressed with zstd.
    pub compressed: bool,
    /// At least one feature has integer categories.
    pub has_int: bool,
    /// At least one feature has byte-string categories.
    pub has_bytes: bool,
    pub has_feature_names: bool,
}

const FLAG_COMPRESSED: u16 = 1 << 0;
const FLAG_HAS_INT: u16 = 1 << 1;
const FLAG_HAS_BYTES: u16 = 1 << 2;
const FLAG_HAS_FEATURE_NAMES: u16 = 1 << 3;

impl FormatFlags {
    fn to_bits(self) -> u16 {
        [
            (self.compressed, FLAG_COMPRESSED),
            (self.has_int, FLAG_HAS_INT),
            (self.has_bytes, FLAG_HAS_BYTES),
            (self.has_feature_names, FLAG_HAS_FEATURE_NAMES),
        ]
        .into_iter()
        .filter(|&(on, _)| on)
        .fold(0, |bits, (_, flag)| bits | flag)
    }

    /// Bits this version does not know are ignored.
    fn from_bits(bits: u16) -> Self {
        Self {
            compressed: bits & FLAG_COMPRESSED != 0,
            has_int: bits & FLAG_HAS_INT != 0,
            has_bytes: bits & FLAG_HAS_BYTES != 0,
            has_feature_names: bits & FLAG_HAS_FEATURE_NAMES != 0,
        }
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header of a category block.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("BCAT")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       2     Reserved
/// 8       2     Flags (bitfield)
/// 10      2     Reserved
/// 12      4     Payload size (bytes)
/// 16      4     CRC32 checksum of payload
/// 20      4     Number of features
/// 24      4     Number of categorical features
/// 28      4     Reserved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: FormatFlags,
    /// Size of the stored payload in bytes.
    pub payload_size: u32,
    /// CRC32 checksum of the stored payload.
    pub checksum: u32,
    pub num_features: u32,
    pub num_categorical: u32,
}

impl FormatHeader {
    /// Create a new header with the current version.
    pub fn new(num_features: u32, num_categorical: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags: FormatFlags::default(),
            payload_size: 0,
            checksum: 0,
            num_features,
            num_categorical,
        }
    }

    /// Serialize header to 32 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..10].copy_from_slice(&self.flags.to_bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.num_features.to_le_bytes());
        buf[24..28].copy_from_slice(&self.num_categorical.to_le_bytes());
        buf
    }

    /// Parse header from 32 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotACategoryBlock);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }
        if version_major == CURRENT_VERSION_MAJOR && version_minor > CURRENT_VERSION_MINOR {
            tracing::warn!(
                major = version_major,
                minor = version_minor,
                "reading category block written by a newer minor version"
            );
        }

        let le_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Ok(Self {
            version_major,
            version_minor,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: le_u32(12),
            checksum: le_u32(16),
            num_features: le_u32(20),
            num_categorical: le_u32(24),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A size does not fit its 32-bit header field.
    #[error("{what} of {size} does not fit the block header")]
    TooLarge { what: &'static str, size: usize },

    #[cfg(feature = "storage-compression")]
    #[error("compression error: {0}")]
    Compression(std::io::Error),
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// Wrong magic bytes.
    #[error("not a category block")]
    NotACategoryBlock,

    #[error("category block requires format {major}.{minor} or later", major = .major, minor = .minor)]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("block truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Decoded fine but violates container invariants.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "storage-compression")]
    #[error("decompression error: {0}")]
    Decompression(std::io::Error),
}

// ============================================================================
// CRC32 Helper
// ============================================================================

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ============================================================================
// Native Codec
// ============================================================================

/// Codec for framing payloads in the native format.
#[derive(Debug, Clone)]
pub struct NativeCodec {
    /// Whether to compress payloads at or above [`COMPRESSION_THRESHOLD`].
    #[cfg(feature = "storage-compression")]
    pub compress: bool,

    /// Compression level (1-22, default 3).
    #[cfg(feature = "storage-compression")]
    pub compression_level: i32,
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeCodec {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "storage-compression")]
            compress: true,
            #[cfg(feature = "storage-compression")]
            compression_level: 3,
        }
    }

    #[cfg(feature = "storage-compression")]
    pub fn without_compression() -> Self {
        Self {
            compress: false,
            compression_level: 0,
        }
    }

    /// Set compression level (1-22).
    #[cfg(feature = "storage-compression")]
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level.clamp(1, 22);
        self
    }

    /// Write header and payload to a writer.
    ///
    /// Fills in `payload_size`, `checksum` and the compression flag of `header`.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        #[cfg(feature = "storage-compression")]
        let (payload_bytes, compressed) = if self.compress && payload.len() >= COMPRESSION_THRESHOLD
        {
            let compressed = zstd::encode_all(payload, self.compression_level)
                .map_err(SerializeError::Compression)?;
            (std::borrow::Cow::Owned(compressed), true)
        } else {
            (std::borrow::Cow::Borrowed(payload), false)
        };

        #[cfg(not(feature = "storage-compression"))]
        let (payload_bytes, compressed) = (std::borrow::Cow::Borrowed(payload), false);

        header.payload_size = u32::try_from(payload_bytes.len())
            .map_err(|_| SerializeError::TooLarge {
                what: "payload size",
                size: payload_bytes.len(),
            })?;
        header.checksum = compute_checksum(&payload_bytes);
        header.flags.compressed = compressed;

        writer.write_all(&header.to_bytes())?;
        writer.write_all(&payload_bytes)?;
        Ok(())
    }

    /// Read header and payload from a reader.
    ///
    /// Returns the payload decompressed, checksum verified.
    pub fn read_from<R: Read>(
        &self,
        reader: &mut R,
    ) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let got = read_up_to(reader, &mut header_buf)?;
        if got < HEADER_SIZE {
            return Err(DeserializeError::Truncated {
                expected: HEADER_SIZE,
                actual: got,
            });
        }
        let header = FormatHeader::from_bytes(&header_buf)?;

        let expected = header.payload_size as usize;
        let mut payload = Vec::new();
        reader
            .by_ref()
            .take(expected as u64)
            .read_to_end(&mut payload)?;
        if payload.len() < expected {
            return Err(DeserializeError::Truncated {
                expected,
                actual: payload.len(),
            });
        }

        let actual_checksum = compute_checksum(&payload);
        if actual_checksum != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual: actual_checksum,
            });
        }

        #[cfg(feature = "storage-compression")]
        let payload = if header.flags.compressed {
            zstd::decode_all(payload.as_slice()).map_err(DeserializeError::Decompression)?
        } else {
            payload
        };

        #[cfg(not(feature = "storage-compression"))]
        if header.flags.compressed {
            return Err(DeserializeError::CorruptPayload(
                "block is compressed but storage-compression feature is not enabled".into(),
            ));
        }

        Ok((header, payload))
    }

    /// Encode `payload` with Postcard and frame it.
    pub fn serialize<T: serde::Serialize>(
        &self,
        mut header: FormatHeader,
        payload: &T,
    ) -> Result<Vec<u8>, SerializeError> {
        let payload_bytes = postcard::to_allocvec(payload)?;
        let mut output = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
        self.write_to(&mut output, &mut header, &payload_bytes)?;
        Ok(output)
    }

    /// Read a framed block from a byte slice and decode its payload.
    ///
    /// Trailing bytes after the payload are rejected.
    pub fn deserialize<T: for<'de> serde::Deserialize<'de>>(
        &self,
        bytes: &[u8],
    ) -> Result<(FormatHeader, T), DeserializeError> {
        let mut cursor = bytes;
        let (header, payload_bytes) = self.read_from(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(DeserializeError::CorruptPayload(format!(
                "{} trailing bytes after payload",
                cursor.len()
            )));
        }
        let payload = postcard::from_bytes(&payload_bytes)?;
        Ok((header, payload))
    }
}

/// Fill `buf` as far as the reader allows. Returns the number of bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FormatHeader {
            version_major: 1,
            version_minor: 0,
            flags: FormatFlags {
                compressed: true,
                has_bytes: true,
                ..Default::default()
            },
            payload_size: 12345,
            checksum: 0xDEADBEEF,
            num_features: 100,
            num_categorical: 3,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[8..10], &[0b101, 0]);
        assert_eq!(FormatHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn unknown_flag_bits_are_ignored() {
        let mut bytes = FormatHeader::new(2, 1).to_bytes();
        bytes[8..10].copy_from_slice(&(FLAG_HAS_INT | 1 << 9).to_le_bytes());
        let header = FormatHeader::from_bytes(&bytes).unwrap();
        assert_eq!(
            header.flags,
            FormatFlags {
                has_int: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn codec_write_read_roundtrip() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(10, 2);
        let payload = b"test payload data";

        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, payload).unwrap();
        assert_eq!(buffer.len(), HEADER_SIZE + payload.len());

        let (read_header, read_payload) = codec.read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_header.num_features, 10);
        assert_eq!(read_header.num_categorical, 2);
        assert_eq!(read_payload, payload);
    }

    #[test]
    fn codec_detects_corruption() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(5, 2);
        let mut buffer = Vec::new();
        codec
            .write_to(&mut buffer, &mut header, b"some category data")
            .unwrap();

        buffer[HEADER_SIZE + 5] ^= 0xFF;
        assert!(matches!(
            codec.read_from(&mut buffer.as_slice()),
            Err(DeserializeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn codec_reports_truncation() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(1, 1);
        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, b"0123456789").unwrap();

        let cut = &buffer[..HEADER_SIZE + 4];
        assert!(matches!(
            codec.read_from(&mut &cut[..]),
            Err(DeserializeError::Truncated {
                expected: 10,
                actual: 4
            })
        ));

        let cut = &buffer[..7];
        assert!(matches!(
            codec.read_from(&mut &cut[..]),
            Err(DeserializeError::Truncated {
                expected: HEADER_SIZE,
                actual: 7
            })
        ));
    }

    #[cfg(feature = "storage-compression")]
    #[test]
    fn large_payload_is_compressed() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(1, 1);
        let payload = vec![7u8; COMPRESSION_THRESHOLD * 2];
        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, &payload).unwrap();
        assert!(header.flags.compressed);
        assert!(buffer.len() < payload.len());

        let (_, read) = codec.read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(read, payload);
    }
}
