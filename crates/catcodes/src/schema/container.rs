//! The frozen, shareable categorical schema of a dataset.

use std::sync::Arc;

use crate::data::FeatureType;
use crate::error::FeatureId;

use super::categories::FeatureCategories;
use super::export::CategoriesExport;

/// Immutable mapping from feature to its categorical schema.
///
/// Numeric features map to `None`. Cloning is cheap: clones share one
/// allocation, so a model and the dataset it was trained on can hold the same
/// container. There is no way to mutate a container once built, which makes
/// it safe to read from any number of threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryContainer {
    inner: Arc<ContainerInner>,
}

#[derive(Debug, PartialEq, Eq)]
struct ContainerInner {
    features: Box<[Option<FeatureCategories>]>,
    feature_names: Option<Box<[String]>>,
}

impl CategoryContainer {
    /// Callers guarantee `feature_names`, when present, has one entry per feature.
    pub(crate) fn new(
        features: Vec<Option<FeatureCategories>>,
        feature_names: Option<Vec<String>>,
    ) -> Self {
        debug_assert!(
            feature_names
                .as_ref()
                .is_none_or(|names| names.len() == features.len())
        );
        Self {
            inner: Arc::new(ContainerInner {
                features: features.into_boxed_slice(),
                feature_names: feature_names.map(Vec::into_boxed_slice),
            }),
        }
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.inner.features.len()
    }

    /// Schema of feature `feature`, or `None` if it is numeric or out of range.
    #[inline]
    pub fn feature(&self, feature: usize) -> Option<&FeatureCategories> {
        self.inner.features.get(feature)?.as_ref()
    }

    /// Type of feature `feature`, or `None` if out of range.
    pub fn feature_type(&self, feature: usize) -> Option<FeatureType> {
        self.inner.features.get(feature).map(|f| match f {
            Some(_) => FeatureType::Categorical,
            None => FeatureType::Numeric,
        })
    }

    /// Feature types in feature order.
    pub fn feature_types(&self) -> Vec<FeatureType> {
        (0..self.n_features())
            .filter_map(|i| self.feature_type(i))
            .collect()
    }

    /// Per-feature schemas in feature order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&FeatureCategories>> + '_ {
        self.inner.features.iter().map(Option::as_ref)
    }

    #[inline]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.inner.feature_names.as_deref()
    }

    /// Display name of a feature: its name, or `f{index}` without names.
    pub fn feature_name(&self, feature: usize) -> String {
        match self.feature_names().and_then(|n| n.get(feature)) {
            Some(name) => name.clone(),
            None => format!("f{}", feature),
        }
    }

    /// Position of the feature called `name`.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names()?.iter().position(|n| n == name)
    }

    pub fn feature_id(&self, feature: usize) -> FeatureId {
        match self.feature_names().and_then(|n| n.get(feature)) {
            Some(name) => FeatureId::named(feature, name.clone()),
            None => FeatureId::index(feature),
        }
    }

    /// Number of categorical features.
    pub fn n_categorical(&self) -> usize {
        self.iter().flatten().count()
    }

    pub fn has_categorical(&self) -> bool {
        self.iter().any(|f| f.is_some())
    }

    /// Sum of category counts over all features.
    pub fn total_categories(&self) -> usize {
        self.iter().flatten().map(FeatureCategories::len).sum()
    }

    /// Export handle. [`CategoriesExport::to_arrow`] fails unless
    /// `export_to_arrow` is set.
    pub fn get_categories(&self, export_to_arrow: bool) -> CategoriesExport {
        CategoriesExport::new(self.clone(), export_to_arrow)
    }

    /// Whether two handles share one allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
