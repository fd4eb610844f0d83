//! Synthetic categorical data for tests and benchmarks.
//!
//! Everything here is deterministic for a given seed.

use rand::prelude::*;

use crate::data::{Batch, CategoricalColumn, Column, Dictionary};
use crate::value::{CategoryValue, ValueKind};

/// Parameters of [`make_categorical`].
#[derive(Clone, Copy, Debug)]
pub struct CategoricalParams {
    /// Fraction of features that are categorical.
    pub cat_ratio: f32,
    /// Probability that any cell is missing.
    pub sparsity: f32,
    /// Value kind of the categorical features.
    pub kind: ValueKind,
    pub seed: u64,
}

impl Default for CategoricalParams {
    fn default() -> Self {
        Self {
            cat_ratio: 0.5,
            sparsity: 0.0,
            kind: ValueKind::Bytes,
            seed: 0,
        }
    }
}

/// The category value for category id `id`.
///
/// Integers are spread out and signed so they never coincide with codes.
pub fn category_value(kind: ValueKind, id: usize) -> CategoryValue {
    match kind {
        ValueKind::Int => CategoryValue::Int(id as i64 * 7 - 3),
        ValueKind::Bytes => CategoryValue::from(format!("cat_{id:03}")),
    }
}

/// Generate a mixed batch and a regression target.
///
/// `round(n_features * cat_ratio)` features, at random positions, are
/// categorical with up to `n_cats` categories each. Every categorical
/// dictionary lists all `n_cats` values in a random order, so local codes
/// differ from sorted order. Numeric values are uniform in `[0, 1)`.
///
/// The target is additive: a random weight per category, a random slope per
/// numeric feature, missing cells contribute nothing. Features are named
/// `f0`, `f1`, ...
///
/// Returns `(batch, targets)`.
pub fn make_categorical(
    n_samples: usize,
    n_features: usize,
    n_cats: usize,
    params: &CategoricalParams,
) -> (Batch, Vec<f32>) {
    assert!(n_cats > 0, "n_cats must be positive");
    assert!((0.0..=1.0).contains(&params.cat_ratio));
    assert!((0.0..=1.0).contains(&params.sparsity));
    let mut rng = StdRng::seed_from_u64(params.seed);

    let n_categorical = ((n_features as f32) * params.cat_ratio).round() as usize;
    let mut is_cat = vec![false; n_features];
    for j in rand::seq::index::sample(&mut rng, n_features, n_categorical.min(n_features)) {
        is_cat[j] = true;
    }

    let mut targets = vec![0.0f32; n_samples];
    let mut columns = Vec::with_capacity(n_features);
    for &categorical in &is_cat {
        if categorical {
            let weights: Vec<f32> = (0..n_cats).map(|_| rng.r#gen::<f32>() * 2.0 - 1.0).collect();
            let mut order: Vec<usize> = (0..n_cats).collect();
            order.shuffle(&mut rng);
            let mut local = vec![0i32; n_cats];
            for (position, &id) in order.iter().enumerate() {
                local[id] = position as i32;
            }

            let mut codes = Vec::with_capacity(n_samples);
            for target in targets.iter_mut() {
                if rng.r#gen::<f32>() < params.sparsity {
                    codes.push(-1);
                } else {
                    let id = rng.gen_range(0..n_cats);
                    *target += weights[id];
                    codes.push(local[id]);
                }
            }
            let dictionary = dictionary_of(params.kind, &order);
            let column = CategoricalColumn::new(dictionary, codes)
                .expect("local codes are in range by construction");
            columns.push(Column::Categorical(column));
        } else {
            let slope = rng.r#gen::<f32>() * 2.0 - 1.0;
            let values: Vec<f32> = targets
                .iter_mut()
                .map(|target| {
                    if rng.r#gen::<f32>() < params.sparsity {
                        f32::NAN
                    } else {
                        let x = rng.r#gen::<f32>();
                        *target += slope * x;
                        x
                    }
                })
                .collect();
            columns.push(Column::Numeric(values));
        }
    }

    let batch = Batch::new(columns)
        .and_then(|b| b.with_feature_names((0..n_features).map(|j| format!("f{j}"))))
        .expect("generated columns have equal length");
    (batch, targets)
}

fn dictionary_of(kind: ValueKind, ids: &[usize]) -> Dictionary {
    let values = ids.iter().map(|&id| category_value(kind, id));
    match kind {
        ValueKind::Int => Dictionary::Int(
            values
                .filter_map(|v| match v {
                    CategoryValue::Int(x) => Some(x),
                    CategoryValue::Bytes(_) => None,
                })
                .collect(),
        ),
        ValueKind::Bytes => Dictionary::Bytes(
            values
                .filter_map(|v| match v {
                    CategoryValue::Bytes(b) => Some(b),
                    CategoryValue::Int(_) => None,
                })
                .collect(),
        ),
    }
}

/// The same batch with every categorical dictionary reordered.
///
/// Row values are unchanged; only the local numbering differs.
pub fn permute_dictionaries(batch: &Batch, seed: u64) -> Batch {
    let mut rng = StdRng::seed_from_u64(seed);
    let columns = batch
        .columns()
        .iter()
        .map(|column| match column {
            Column::Numeric(_) => column.clone(),
            Column::Categorical(c) => Column::Categorical(permute_column(c, &mut rng)),
        })
        .collect();
    let permuted = Batch::new(columns).expect("row counts are unchanged");
    match batch.feature_names() {
        Some(names) => permuted
            .with_feature_names(names.iter().cloned())
            .expect("feature count is unchanged"),
        None => permuted,
    }
}

fn permute_column(column: &CategoricalColumn, rng: &mut StdRng) -> CategoricalColumn {
    let mut order: Vec<usize> = (0..column.dictionary().len()).collect();
    order.shuffle(rng);
    let mut new_code = vec![0i32; order.len()];
    for (position, &old) in order.iter().enumerate() {
        new_code[old] = position as i32;
    }

    let dictionary = match column.dictionary() {
        Dictionary::Int(v) => Dictionary::Int(order.iter().map(|&i| v[i]).collect()),
        Dictionary::Bytes(v) => Dictionary::Bytes(order.iter().map(|&i| v[i].clone()).collect()),
    };
    let codes = column
        .codes()
        .iter()
        .map(|&c| if c < 0 { c } else { new_code[c as usize] })
        .collect();
    CategoricalColumn::new(dictionary, codes).expect("permutation keeps codes in range")
}

/// Cut a batch into consecutive batches of at most `rows_per_batch` rows.
pub fn split_rows(batch: &Batch, rows_per_batch: usize) -> Vec<Batch> {
    assert!(rows_per_batch > 0, "rows_per_batch must be positive");
    (0..batch.n_rows())
        .step_by(rows_per_batch)
        .map(|start| batch.slice_rows(start, (start + rows_per_batch).min(batch.n_rows())))
        .collect()
}
