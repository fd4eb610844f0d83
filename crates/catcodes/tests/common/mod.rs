//! Shared helpers for integration tests.
//!
//! [`BucketModel`] stands in for a trained model: it learns one additive
//! term per (feature, bucket) where a categorical bucket is a canonical code.
//! If two datasets disagreed on what a code means, its predictions on them
//! would differ.

#![allow(dead_code)]

use catcodes::{CategoryContainer, EncodedDataset};
use ndarray::ArrayView2;

/// Numeric features split at this value.
const NUMERIC_SPLIT: f32 = 0.5;

/// An additive model over per-feature buckets.
#[derive(Debug, Clone)]
pub struct BucketModel {
    base: f32,
    /// `terms[feature][bucket]`; the last bucket is "missing".
    terms: Vec<Vec<f32>>,
    categorical: Vec<bool>,
}

impl BucketModel {
    /// Fit bucket means of `targets` on a dataset.
    pub fn fit(dataset: &EncodedDataset, targets: &[f32]) -> Self {
        let features = dataset.features();
        let categories = dataset.categories();
        assert_eq!(features.ncols(), targets.len());

        let base = targets.iter().sum::<f32>() / targets.len().max(1) as f32;
        let categorical: Vec<bool> = categories.iter().map(|f| f.is_some()).collect();
        let terms = (0..categories.n_features())
            .map(|feature| {
                let n_buckets = n_buckets(categories, feature);
                let mut sums = vec![0.0f32; n_buckets];
                let mut counts = vec![0usize; n_buckets];
                for (row, &y) in targets.iter().enumerate() {
                    let b = bucket(categorical[feature], n_buckets, features[[feature, row]]);
                    sums[b] += y - base;
                    counts[b] += 1;
                }
                sums.iter()
                    .zip(&counts)
                    .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f32 })
                    .collect()
            })
            .collect();

        Self {
            base,
            terms,
            categorical,
        }
    }

    /// Predict from a feature-major matrix `[n_features, n_rows]`.
    pub fn predict(&self, features: ArrayView2<'_, f32>) -> Vec<f32> {
        assert_eq!(features.nrows(), self.terms.len());
        (0..features.ncols())
            .map(|row| {
                self.base
                    + self
                        .terms
                        .iter()
                        .enumerate()
                        .map(|(f, terms)| {
                            terms[bucket(self.categorical[f], terms.len(), features[[f, row]])]
                        })
                        .sum::<f32>()
            })
            .collect()
    }
}

fn n_buckets(categories: &CategoryContainer, feature: usize) -> usize {
    match categories.feature(feature) {
        Some(f) => f.len() + 1,
        None => 3,
    }
}

fn bucket(categorical: bool, n_buckets: usize, value: f32) -> usize {
    if value.is_nan() {
        n_buckets - 1
    } else if categorical {
        value as usize
    } else if value < NUMERIC_SPLIT {
        0
    } else {
        1
    }
}

/// Root mean squared error.
pub fn rmse(predictions: &[f32], targets: &[f32]) -> f64 {
    assert_eq!(predictions.len(), targets.len());
    let sse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(&p, &y)| f64::from(p - y).powi(2))
        .sum();
    (sse / targets.len().max(1) as f64).sqrt()
}

/// Bitwise equality of float slices, NaN included.
pub fn same_bits(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}
