//! Value-keyed code projection.
//!
//! Projection never trusts a column's local codes: each local code is
//! resolved to its dictionary value, and the value is looked up in the
//! schema. Two columns holding the same values under different local
//! numbering therefore project to identical codes.

use crate::data::{CategoricalColumn, Dictionary};
use crate::error::{CategoryError, FeatureId};
use crate::schema::FeatureCategories;

/// Code written for a missing row.
pub const MISSING_CODE: i32 = -1;

/// Local code whose schema code is not resolved yet.
const UNRESOLVED: i32 = i32::MIN;

/// How projection treats values that are not in the schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Projection {
    /// Unseen values and kind mismatches are errors. Use for any data that did
    /// not build the schema.
    #[default]
    Strict,
    /// Every value is known to be in the schema because the same data built
    /// it. A violation is a bug and panics.
    Trusted,
}

impl Projection {
    #[inline]
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Projection::Strict
        } else {
            Projection::Trusted
        }
    }

    #[inline]
    pub fn is_strict(self) -> bool {
        matches!(self, Projection::Strict)
    }
}

/// Canonical codes for one column of one batch, one per row.
///
/// Codes are in `0..K` for the feature's `K` categories, or
/// [`MISSING_CODE`] for missing rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBuffer {
    codes: Box<[i32]>,
}

impl CodeBuffer {
    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.codes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code of row `row`; `None` if the row is missing or out of range.
    #[inline]
    pub fn get(&self, row: usize) -> Option<u32> {
        self.codes
            .get(row)
            .and_then(|&c| (c != MISSING_CODE).then_some(c as u32))
    }

    pub fn null_count(&self) -> usize {
        self.codes.iter().filter(|&&c| c == MISSING_CODE).count()
    }

    pub fn into_vec(self) -> Vec<i32> {
        self.codes.into_vec()
    }
}

impl AsRef<[i32]> for CodeBuffer {
    fn as_ref(&self) -> &[i32] {
        &self.codes
    }
}

/// Project a column onto the code space of `schema`.
///
/// Each distinct local code is looked up once (binary search in the schema);
/// rows then copy the resolved code. `feature` names the feature in errors.
///
/// # Errors
///
/// With [`Projection::Strict`]:
/// - [`CategoryError::TypeMismatch`] if the column's dictionary holds the
///   other value kind. Checked before any lookup.
/// - [`CategoryError::UnseenCategory`] for the first row whose value is not
///   in the schema. Nothing is returned for the rest of the column.
///
/// # Panics
///
/// With [`Projection::Trusted`], panics where strict mode would return an
/// error.
pub fn project_column(
    schema: &FeatureCategories,
    column: &CategoricalColumn,
    mode: Projection,
    feature: &FeatureId,
) -> Result<CodeBuffer, CategoryError> {
    let dictionary = column.dictionary();
    check_kind(schema, dictionary, feature)
        .map_err(|err| trusted_violation(mode, err))?;

    let mut resolved = vec![UNRESOLVED; dictionary.len()];
    let mut codes = Vec::with_capacity(column.len());
    for &local in column.codes() {
        if local < 0 {
            codes.push(MISSING_CODE);
            continue;
        }
        let slot = &mut resolved[local as usize];
        if *slot == UNRESOLVED {
            *slot = resolve(schema, dictionary, local as usize, feature)
                .map_err(|err| trusted_violation(mode, err))?;
        }
        codes.push(*slot);
    }

    Ok(CodeBuffer {
        codes: codes.into_boxed_slice(),
    })
}

/// Value-kind compatibility of a dictionary with a schema.
///
/// An empty dictionary is compatible with anything. So is a schema of
/// unknown kind: every non-missing value is then simply unseen.
pub(crate) fn check_kind(
    schema: &FeatureCategories,
    dictionary: &Dictionary,
    feature: &FeatureId,
) -> Result<(), CategoryError> {
    match schema.kind() {
        Some(kind) if !dictionary.is_empty() && dictionary.kind() != kind => {
            Err(CategoryError::TypeMismatch {
                feature: feature.clone(),
                expected: schema.describe(),
                found: format!("categorical ({})", dictionary.kind()),
            })
        }
        _ => Ok(()),
    }
}

fn resolve(
    schema: &FeatureCategories,
    dictionary: &Dictionary,
    local: usize,
    feature: &FeatureId,
) -> Result<i32, CategoryError> {
    // Local codes were range-checked when the column was built.
    let Some(value) = dictionary.get(local) else {
        unreachable!("local code {local} outside dictionary of {}", dictionary.len());
    };
    match schema.code_of(value) {
        Some(code) => Ok(code as i32),
        None => Err(CategoryError::UnseenCategory {
            feature: feature.clone(),
            value: value.to_value(),
        }),
    }
}

fn trusted_violation(mode: Projection, err: CategoryError) -> CategoryError {
    if !mode.is_strict() {
        panic!("trusted projection against a schema not built from this data: {err}");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Categories;
    use crate::value::CategoryValue;

    fn abc_cdef() -> FeatureCategories {
        FeatureCategories::new(
            Categories::Bytes(["abc", "cdef"].iter().map(|s| s.as_bytes().into()).collect()),
            0,
        )
    }

    fn project(column: &CategoricalColumn) -> Result<CodeBuffer, CategoryError> {
        project_column(&abc_cdef(), column, Projection::Strict, &FeatureId::named(0, "c"))
    }

    #[test]
    fn projects_by_value_in_either_order() {
        let forward = CategoricalColumn::from_strs(&[Some("abc"), Some("cdef")]);
        let backward = CategoricalColumn::from_strs(&[Some("cdef"), Some("abc")]);
        assert_eq!(project(&forward).unwrap().as_slice(), &[0, 1]);
        assert_eq!(project(&backward).unwrap().as_slice(), &[1, 0]);
    }

    #[test]
    fn missing_rows_get_missing_code() {
        let col = CategoricalColumn::from_strs(&[None, Some("cdef"), None]);
        let codes = project(&col).unwrap();
        assert_eq!(codes.as_slice(), &[MISSING_CODE, 1, MISSING_CODE]);
        assert_eq!(codes.null_count(), 2);
        assert_eq!(codes.get(0), None);
        assert_eq!(codes.get(1), Some(1));
    }

    #[test]
    fn unseen_value_is_rejected() {
        let col = CategoricalColumn::from_strs(&[Some("abc"), Some("def")]);
        let err = project(&col).unwrap_err();
        assert_eq!(
            err,
            CategoryError::UnseenCategory {
                feature: FeatureId::named(0, "c"),
                value: CategoryValue::from("def"),
            }
        );
    }

    #[test]
    fn nul_suffix_is_a_different_value() {
        let col = CategoricalColumn::from_strs(&[Some("abc\0")]);
        assert!(matches!(
            project(&col),
            Err(CategoryError::UnseenCategory { .. })
        ));
    }

    #[test]
    fn unreferenced_dictionary_entries_are_ignored() {
        let dict = Dictionary::from_strs(["zzz", "abc"]);
        let col = CategoricalColumn::new(dict, vec![1, -1]).unwrap();
        assert_eq!(project(&col).unwrap().as_slice(), &[0, MISSING_CODE]);
    }

    #[test]
    fn other_kind_is_a_type_mismatch() {
        let col = CategoricalColumn::from_ints(&[Some(1)]);
        assert!(matches!(
            project(&col),
            Err(CategoryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn empty_schema_sees_nothing() {
        let schema = FeatureCategories::default();
        let col = CategoricalColumn::from_ints(&[None, Some(3)]);
        let err = project_column(&schema, &col, Projection::Strict, &FeatureId::index(0));
        assert!(matches!(err, Err(CategoryError::UnseenCategory { .. })));
    }

    #[test]
    #[should_panic(expected = "trusted projection")]
    fn trusted_projection_panics_on_unseen() {
        let col = CategoricalColumn::from_strs(&[Some("def")]);
        let _ = project_column(&abc_cdef(), &col, Projection::Trusted, &FeatureId::index(0));
    }
}
