//! Category values.
//!
//! A category is either a 64-bit integer or a byte string. Byte strings are
//! compared by raw bytes: no decoding, trimming, case folding, or implied
//! NUL terminator. `"abc"` and `"abc\0"` are different categories.
//!
//! Missing values are never represented as a category; columns carry them
//! out-of-band (see [`crate::data::CategoricalColumn`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The physical type of the values of a categorical feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    /// 64-bit signed integers.
    Int,
    /// Arbitrary byte strings (usually UTF-8 text).
    Bytes,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => f.write_str("int64"),
            ValueKind::Bytes => f.write_str("bytes"),
        }
    }
}

/// An owned category value.
///
/// Ordering: integers compare numerically, byte strings lexicographically by
/// raw bytes. Integers order before byte strings, though a single feature
/// never mixes the two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryValue {
    Int(i64),
    Bytes(Box<[u8]>),
}

impl CategoryValue {
    /// The kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            CategoryValue::Int(_) => ValueKind::Int,
            CategoryValue::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// Borrow this value.
    #[inline]
    pub fn as_borrowed(&self) -> CategoryRef<'_> {
        match self {
            CategoryValue::Int(v) => CategoryRef::Int(*v),
            CategoryValue::Bytes(b) => CategoryRef::Bytes(b),
        }
    }
}

impl From<i64> for CategoryValue {
    fn from(value: i64) -> Self {
        CategoryValue::Int(value)
    }
}

impl From<&str> for CategoryValue {
    fn from(value: &str) -> Self {
        CategoryValue::Bytes(value.as_bytes().into())
    }
}

impl From<String> for CategoryValue {
    fn from(value: String) -> Self {
        CategoryValue::Bytes(value.into_bytes().into_boxed_slice())
    }
}

impl From<&[u8]> for CategoryValue {
    fn from(value: &[u8]) -> Self {
        CategoryValue::Bytes(value.into())
    }
}

impl From<Vec<u8>> for CategoryValue {
    fn from(value: Vec<u8>) -> Self {
        CategoryValue::Bytes(value.into_boxed_slice())
    }
}

impl fmt::Display for CategoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_borrowed().fmt(f)
    }
}

/// A borrowed category value, as read out of a dictionary or a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryRef<'a> {
    Int(i64),
    Bytes(&'a [u8]),
}

impl CategoryRef<'_> {
    /// The kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            CategoryRef::Int(_) => ValueKind::Int,
            CategoryRef::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// Copy into an owned value.
    pub fn to_value(&self) -> CategoryValue {
        match *self {
            CategoryRef::Int(v) => CategoryValue::Int(v),
            CategoryRef::Bytes(b) => CategoryValue::Bytes(b.into()),
        }
    }
}

impl fmt::Display for CategoryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryRef::Int(v) => write!(f, "{}", v),
            CategoryRef::Bytes(b) => write!(f, "\"{}\"", b.escape_ascii()),
        }
    }
}
