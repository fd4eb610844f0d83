//! Raw feature columns as supplied by a frame adapter.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::SchemaError;
use crate::value::{CategoryRef, ValueKind};

/// Logical feature types.
///
/// The categorical/numeric flag is always supplied by the caller; nothing in
/// this crate infers it from the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FeatureType {
    /// Continuous numeric feature. Missing values: `f32::NAN`.
    #[default]
    Numeric,

    /// Categorical feature backed by a dictionary of category values.
    Categorical,
}

impl FeatureType {
    /// Returns true if this is a categorical feature.
    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureType::Categorical)
    }

    /// Returns true if this is a numeric feature.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, FeatureType::Numeric)
    }

    /// Parse an XGBoost-style feature type name.
    ///
    /// `int`, `float`, `i` and `q` are numeric; `c` is categorical.
    pub fn parse(name: &str) -> Result<Self, SchemaError> {
        match name {
            "int" | "float" | "i" | "q" => Ok(FeatureType::Numeric),
            "c" => Ok(FeatureType::Categorical),
            other => Err(SchemaError::UnknownFeatureType(other.to_string())),
        }
    }

    /// Parse a list of type names.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, SchemaError> {
        names.iter().map(|n| Self::parse(n.as_ref())).collect()
    }
}

impl FromStr for FeatureType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The category dictionary of one column: local code `i` refers to entry `i`.
///
/// Entries may appear in any order. Two columns holding the same values can
/// number them differently, which is why projection goes by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dictionary {
    Int(Vec<i64>),
    Bytes(Vec<Box<[u8]>>),
}

impl Dictionary {
    /// Build a byte dictionary from strings.
    pub fn from_strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Dictionary::Bytes(
            values
                .into_iter()
                .map(|s| s.as_ref().as_bytes().into())
                .collect(),
        )
    }

    /// Kind of the entries.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Dictionary::Int(_) => ValueKind::Int,
            Dictionary::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Dictionary::Int(v) => v.len(),
            Dictionary::Bytes(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at local code `code`.
    #[inline]
    pub fn get(&self, code: usize) -> Option<CategoryRef<'_>> {
        match self {
            Dictionary::Int(v) => v.get(code).map(|&x| CategoryRef::Int(x)),
            Dictionary::Bytes(v) => v.get(code).map(|b| CategoryRef::Bytes(b)),
        }
    }
}

/// A categorical column: a dictionary plus one local code per row.
///
/// Negative codes mark missing rows. Every non-negative code is checked
/// against the dictionary at construction, so a `CategoricalColumn` never
/// references an entry it does not have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoricalColumn {
    dictionary: Dictionary,
    codes: Vec<i32>,
}

impl CategoricalColumn {
    /// Create a column from a dictionary and per-row local codes.
    pub fn new(dictionary: Dictionary, codes: Vec<i32>) -> Result<Self, SchemaError> {
        let len = dictionary.len();
        if let Some((row, &code)) = codes
            .iter()
            .enumerate()
            .find(|&(_, &c)| c >= 0 && c as usize >= len)
        {
            return Err(SchemaError::InvalidCode {
                row,
                code,
                dictionary_len: len,
            });
        }
        Ok(Self { dictionary, codes })
    }

    /// Dictionary-encode string values in order of first appearance.
    ///
    /// `None` is a missing row.
    pub fn from_strs(values: &[Option<&str>]) -> Self {
        Self::encode(values.iter().map(|v| v.map(str::as_bytes)), |b| {
            Dictionary::Bytes(b.into_iter().map(Into::into).collect())
        })
    }

    /// Dictionary-encode raw byte values in order of first appearance.
    pub fn from_bytes(values: &[Option<&[u8]>]) -> Self {
        Self::encode(values.iter().copied(), |b| {
            Dictionary::Bytes(b.into_iter().map(Into::into).collect())
        })
    }

    /// Dictionary-encode integer values in order of first appearance.
    pub fn from_ints(values: &[Option<i64>]) -> Self {
        Self::encode(values.iter().copied(), Dictionary::Int)
    }

    fn encode<T, I, F>(values: I, make: F) -> Self
    where
        T: Copy + Eq + std::hash::Hash,
        I: Iterator<Item = Option<T>>,
        F: FnOnce(Vec<T>) -> Dictionary,
    {
        let mut seen: HashMap<T, i32> = HashMap::new();
        let mut entries = Vec::new();
        let codes = values
            .map(|v| match v {
                Some(v) => *seen.entry(v).or_insert_with(|| {
                    entries.push(v);
                    (entries.len() - 1) as i32
                }),
                None => -1,
            })
            .collect();
        Self {
            dictionary: make(entries),
            codes,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Per-row local codes; negative means missing.
    #[inline]
    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The value in row `row`, or `None` if the row is missing.
    #[inline]
    pub fn value(&self, row: usize) -> Option<CategoryRef<'_>> {
        let code = *self.codes.get(row)?;
        if code < 0 {
            None
        } else {
            self.dictionary.get(code as usize)
        }
    }

    /// Number of missing rows.
    pub fn null_count(&self) -> usize {
        self.codes.iter().filter(|&&c| c < 0).count()
    }

    /// Rows `start..end`, sharing nothing with `self`. The dictionary is kept whole.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            dictionary: self.dictionary.clone(),
            codes: self.codes[start..end].to_vec(),
        }
    }
}

/// One feature column of a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Plain numeric values; `NaN` is missing.
    Numeric(Vec<f32>),
    /// Dictionary-encoded categorical values.
    Categorical(CategoricalColumn),
}

impl Column {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The feature type this column presents.
    pub fn feature_type(&self) -> FeatureType {
        match self {
            Column::Numeric(_) => FeatureType::Numeric,
            Column::Categorical(_) => FeatureType::Categorical,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalColumn> {
        match self {
            Column::Categorical(c) => Some(c),
            Column::Numeric(_) => None,
        }
    }

    /// Human-readable description used in type-mismatch errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            Column::Numeric(_) => "numeric".to_string(),
            Column::Categorical(c) => format!("categorical ({})", c.dictionary().kind()),
        }
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> Self {
        match self {
            Column::Numeric(v) => Column::Numeric(v[start..end].to_vec()),
            Column::Categorical(c) => Column::Categorical(c.slice(start, end)),
        }
    }
}

impl From<CategoricalColumn> for Column {
    fn from(column: CategoricalColumn) -> Self {
        Column::Categorical(column)
    }
}

impl From<Vec<f32>> for Column {
    fn from(values: Vec<f32>) -> Self {
        Column::Numeric(values)
    }
}
