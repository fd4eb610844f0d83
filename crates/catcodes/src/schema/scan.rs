//! Per-batch column scanning.
//!
//! Reduces one categorical column of one batch to the sorted, distinct values
//! its rows reference plus the number of missing rows. Values are compared
//! byte-exactly; nothing is normalised.

use crate::data::{CategoricalColumn, Dictionary};
use crate::value::ValueKind;

/// Sorted distinct values seen in a column, borrowing from its dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedValues<'a> {
    Int(Vec<i64>),
    Bytes(Vec<&'a [u8]>),
}

impl ScannedValues<'_> {
    pub fn len(&self) -> usize {
        match self {
            ScannedValues::Int(v) => v.len(),
            ScannedValues::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of scanning one column of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnScan<'a> {
    values: ScannedValues<'a>,
    kind: Option<ValueKind>,
    null_count: u64,
}

impl<'a> ColumnScan<'a> {
    /// Distinct referenced values, strictly increasing.
    #[inline]
    pub fn values(&self) -> &ScannedValues<'a> {
        &self.values
    }

    /// Kind of the column's dictionary. `None` for an empty dictionary, which
    /// says nothing about the feature's kind.
    #[inline]
    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    #[inline]
    pub fn null_count(&self) -> u64 {
        self.null_count
    }
}

/// Scan a categorical column.
///
/// Only dictionary entries referenced by at least one row are reported.
/// Duplicate dictionary entries collapse into one value.
///
/// This deliberately departs from taking a frame's whole dictionary as its
/// categories. An entry no row uses gets no code, so a frame whose
/// dictionary was never pruned after filtering yields the same schema as
/// one that was, and projection never checks unused entries.
pub fn scan_column(column: &CategoricalColumn) -> ColumnScan<'_> {
    let dictionary = column.dictionary();
    let mut referenced = vec![false; dictionary.len()];
    let mut null_count = 0u64;
    for &code in column.codes() {
        if code < 0 {
            null_count += 1;
        } else {
            referenced[code as usize] = true;
        }
    }

    let values = match dictionary {
        Dictionary::Int(entries) => {
            let mut values = pick(entries, &referenced, |&v| v);
            values.sort_unstable();
            values.dedup();
            ScannedValues::Int(values)
        }
        Dictionary::Bytes(entries) => {
            let mut values = pick(entries, &referenced, |b| &b[..]);
            values.sort_unstable();
            values.dedup();
            ScannedValues::Bytes(values)
        }
    };

    ColumnScan {
        values,
        kind: (!dictionary.is_empty()).then(|| dictionary.kind()),
        null_count,
    }
}

fn pick<'a, T, U>(entries: &'a [T], referenced: &[bool], f: impl Fn(&'a T) -> U) -> Vec<U> {
    entries
        .iter()
        .zip(referenced)
        .filter(|&(_, &r)| r)
        .map(|(e, _)| f(e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_distinct_with_null_count() {
        let col = CategoricalColumn::from_strs(&[Some("cdef"), None, Some("abc"), Some("abc")]);
        let scan = scan_column(&col);
        assert_eq!(
            scan.values(),
            &ScannedValues::Bytes(vec![b"abc".as_slice(), b"cdef".as_slice()])
        );
        assert_eq!(scan.null_count(), 1);
        assert_eq!(scan.kind(), Some(ValueKind::Bytes));
    }

    #[test]
    fn unreferenced_entries_are_skipped() {
        let col = CategoricalColumn::new(Dictionary::Int(vec![9, 4, 7]), vec![2, -1, 2]).unwrap();
        let scan = scan_column(&col);
        assert_eq!(scan.values(), &ScannedValues::Int(vec![7]));
    }

    #[test]
    fn pruned_and_unpruned_dictionaries_agree() {
        let unpruned =
            CategoricalColumn::new(Dictionary::from_strs(["z", "b", "q", "a"]), vec![3, 1, -1])
                .unwrap();
        let pruned = CategoricalColumn::new(Dictionary::from_strs(["a", "b"]), vec![0, 1, -1])
            .unwrap();
        let (unpruned, pruned) = (scan_column(&unpruned), scan_column(&pruned));
        assert_eq!(unpruned.values(), pruned.values());
        assert_eq!(unpruned.null_count(), pruned.null_count());
    }

    #[test]
    fn duplicate_dictionary_entries_collapse() {
        let col = CategoricalColumn::new(Dictionary::from_strs(["x", "x", "a"]), vec![0, 1, 2])
            .unwrap();
        let scan = scan_column(&col);
        assert_eq!(scan.values().len(), 2);
    }

    #[test]
    fn bytes_are_not_normalised() {
        let col = CategoricalColumn::from_strs(&[Some("abc\0"), Some("abc"), Some("ABC")]);
        let scan = scan_column(&col);
        assert_eq!(
            scan.values(),
            &ScannedValues::Bytes(vec![b"ABC".as_slice(), b"abc".as_slice(), b"abc\0".as_slice()])
        );
    }

    #[test]
    fn empty_dictionary_has_no_kind() {
        let col = CategoricalColumn::from_ints(&[None, None]);
        let scan = scan_column(&col);
        assert!(scan.values().is_empty());
        assert_eq!(scan.kind(), None);
        assert_eq!(scan.null_count(), 2);
    }
}
