//! Dictionary export of a container to Arrow arrays.

use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray, Int64Array, StringArray};

use crate::error::CategoryError;

use super::categories::Categories;
use super::container::CategoryContainer;

/// One exported feature: its name and its categories in code order, or
/// `None` for a numeric feature.
pub type ExportedFeature = (String, Option<ArrayRef>);

/// Handle returned by [`CategoryContainer::get_categories`].
///
/// Export must be requested up front; a handle created with
/// `export_to_arrow = false` refuses to export.
#[derive(Clone, Debug)]
pub struct CategoriesExport {
    container: CategoryContainer,
    enabled: bool,
}

impl CategoriesExport {
    pub(crate) fn new(container: CategoryContainer, enabled: bool) -> Self {
        Self { container, enabled }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The container this handle reads from.
    #[inline]
    pub fn container(&self) -> &CategoryContainer {
        &self.container
    }

    /// One entry per feature, in feature order.
    ///
    /// Features are named by their feature name, or `f{index}` if the
    /// container has none. Integer categories become an `Int64Array`; byte
    /// categories become a `StringArray` if they are all valid UTF-8 and a
    /// `BinaryArray` otherwise.
    ///
    /// # Errors
    ///
    /// [`CategoryError::ExportDisabled`] if the handle was not created with
    /// `export_to_arrow = true`.
    pub fn to_arrow(&self) -> Result<Vec<ExportedFeature>, CategoryError> {
        if !self.enabled {
            return Err(CategoryError::ExportDisabled);
        }
        Ok(self
            .container
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let array = feature.map(|f| categories_to_array(f.categories()));
                (self.container.feature_name(i), array)
            })
            .collect())
    }
}

fn categories_to_array(categories: &Categories) -> ArrayRef {
    match categories {
        Categories::Empty => Arc::new(StringArray::from_iter_values(std::iter::empty::<&str>())),
        Categories::Int(values) => Arc::new(Int64Array::from(values.to_vec())),
        Categories::Bytes(values) => {
            let strs: Option<Vec<&str>> =
                values.iter().map(|b| std::str::from_utf8(b).ok()).collect();
            match strs {
                Some(strs) => Arc::new(StringArray::from_iter_values(strs)),
                None => Arc::new(BinaryArray::from_iter_values(values.iter())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureCategories;
    use arrow::array::Array;
    use arrow::datatypes::DataType;

    fn bytes(values: &[&[u8]]) -> Categories {
        Categories::Bytes(values.iter().map(|&b| b.into()).collect())
    }

    fn container() -> CategoryContainer {
        CategoryContainer::new(
            vec![
                Some(FeatureCategories::new(bytes(&[b"abc", b"cdef"]), 1)),
                None,
                Some(FeatureCategories::new(
                    Categories::Int(vec![-3, 10].into_boxed_slice()),
                    0,
                )),
                Some(FeatureCategories::new(bytes(&[b"a", b"\xff"]), 0)),
            ],
            None,
        )
    }

    #[test]
    fn disabled_export_fails() {
        let err = container().get_categories(false).to_arrow().unwrap_err();
        assert_eq!(err, CategoryError::ExportDisabled);
    }

    #[test]
    fn exports_in_feature_order() {
        let exported = container().get_categories(true).to_arrow().unwrap();
        assert_eq!(exported.len(), 4);

        let names: Vec<&str> = exported.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["f0", "f1", "f2", "f3"]);

        let strings = exported[0].1.as_ref().unwrap();
        let strings = strings.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(strings.value(0), "abc");
        assert_eq!(strings.value(1), "cdef");

        assert!(exported[1].1.is_none());

        let ints = exported[2].1.as_ref().unwrap();
        assert_eq!(ints.data_type(), &DataType::Int64);
        assert_eq!(ints.len(), 2);

        let binary = exported[3].1.as_ref().unwrap();
        assert_eq!(binary.data_type(), &DataType::Binary);
    }
}
