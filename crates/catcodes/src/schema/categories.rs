//! Frozen per-feature category lists.

use crate::value::{CategoryRef, CategoryValue, ValueKind};

/// Sorted, distinct category values of one feature. Index = ordinal code.
///
/// Strictly increasing by the order of [`CategoryValue`]. Lookups are binary
/// searches.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Categories {
    /// No values and no known kind: the feature never carried a dictionary.
    #[default]
    Empty,
    Int(Box<[i64]>),
    Bytes(Box<[Box<[u8]>]>),
}

impl Categories {
    /// Number of categories (the size of the code space).
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Categories::Empty => 0,
            Categories::Int(v) => v.len(),
            Categories::Bytes(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of the values, if known.
    #[inline]
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Categories::Empty => None,
            Categories::Int(_) => Some(ValueKind::Int),
            Categories::Bytes(_) => Some(ValueKind::Bytes),
        }
    }

    /// The value with ordinal code `code`.
    #[inline]
    pub fn get(&self, code: usize) -> Option<CategoryRef<'_>> {
        match self {
            Categories::Empty => None,
            Categories::Int(v) => v.get(code).map(|&x| CategoryRef::Int(x)),
            Categories::Bytes(v) => v.get(code).map(|b| CategoryRef::Bytes(b)),
        }
    }

    /// The ordinal code of `value`, or `None` if it is not a category.
    ///
    /// A value of the other kind is never found.
    #[inline]
    pub fn code_of(&self, value: CategoryRef<'_>) -> Option<u32> {
        let idx = match (self, value) {
            (Categories::Int(v), CategoryRef::Int(x)) => v.binary_search(&x).ok(),
            (Categories::Bytes(v), CategoryRef::Bytes(b)) => {
                v.binary_search_by(|probe| probe[..].cmp(b)).ok()
            }
            _ => None,
        };
        idx.map(|i| i as u32)
    }

    /// Iterate categories in code order.
    pub fn iter(&self) -> impl Iterator<Item = CategoryRef<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Copy out as owned values, in code order.
    pub fn to_values(&self) -> Vec<CategoryValue> {
        self.iter().map(|v| v.to_value()).collect()
    }

    /// Whether every value is strictly greater than its predecessor.
    pub(crate) fn is_strictly_increasing(&self) -> bool {
        match self {
            Categories::Empty => true,
            Categories::Int(v) => v.windows(2).all(|w| w[0] < w[1]),
            Categories::Bytes(v) => v.windows(2).all(|w| w[0] < w[1]),
        }
    }
}

/// The frozen categorical schema of one feature.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FeatureCategories {
    categories: Categories,
    null_count: u64,
}

impl FeatureCategories {
    /// Callers guarantee `categories` is strictly increasing.
    pub(crate) fn new(categories: Categories, null_count: u64) -> Self {
        debug_assert!(categories.is_strictly_increasing());
        Self {
            categories,
            null_count,
        }
    }

    /// Sorted categories; the position of a value is its code.
    #[inline]
    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Missing entries observed while building. Informational only.
    #[inline]
    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    #[inline]
    pub fn kind(&self) -> Option<ValueKind> {
        self.categories.kind()
    }

    /// Ordinal code of `value`.
    #[inline]
    pub fn code_of(&self, value: CategoryRef<'_>) -> Option<u32> {
        self.categories.code_of(value)
    }

    /// Value behind ordinal code `code`.
    #[inline]
    pub fn value_of(&self, code: u32) -> Option<CategoryRef<'_>> {
        self.categories.get(code as usize)
    }

    pub(crate) fn describe(&self) -> String {
        match self.kind() {
            Some(kind) => format!("categorical ({})", kind),
            None => "categorical".to_string(),
        }
    }
}
