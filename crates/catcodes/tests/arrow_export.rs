//! Arrow in, Arrow out: record batches become datasets, categories export as
//! dictionary values.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;

use catcodes::{Batch, CategoryError, EncodedDataset, RecodeConfig};

fn record_batch(cities: Vec<Option<&str>>, zips: DictionaryArray<Int32Type>) -> RecordBatch {
    let n = cities.len();
    let cities: DictionaryArray<Int32Type> = cities.into_iter().collect();
    let x = Float64Array::from_iter((0..n).map(|i| (i % 3 != 0).then_some(i as f64)));
    let schema = Schema::new(vec![
        Field::new("x", DataType::Float64, true),
        Field::new("city", cities.data_type().clone(), true),
        Field::new("zip", zips.data_type().clone(), true),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(x), Arc::new(cities), Arc::new(zips)],
    )
    .unwrap()
}

fn zips(keys: Vec<Option<i32>>, values: Vec<i64>) -> DictionaryArray<Int32Type> {
    DictionaryArray::try_new(Int32Array::from(keys), Arc::new(Int64Array::from(values))).unwrap()
}

fn as_strings(array: &ArrayRef) -> Vec<&str> {
    let strings = array.as_any().downcast_ref::<StringArray>().unwrap();
    strings.iter().map(Option::unwrap).collect()
}

#[test]
fn exports_sorted_categories_per_feature() {
    let first = record_batch(
        vec![Some("paris"), None, Some("oslo"), Some("paris")],
        zips(vec![Some(1), Some(0), None, Some(1)], vec![75001, 1050]),
    );
    let second = record_batch(
        vec![Some("berlin"), Some("oslo")],
        zips(vec![Some(0), Some(0)], vec![10115]),
    );
    let batches = [
        Batch::from_record_batch(&first).unwrap(),
        Batch::from_record_batch(&second).unwrap(),
    ];
    let dataset = EncodedDataset::from_batches(&batches, &RecodeConfig::default()).unwrap();

    let exported = dataset.get_categories(true).to_arrow().unwrap();
    let names: Vec<&str> = exported.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["x", "city", "zip"]);
    assert!(exported[0].1.is_none());

    let cities = exported[1].1.as_ref().unwrap();
    assert_eq!(as_strings(cities), ["berlin", "oslo", "paris"]);

    let zips = exported[2].1.as_ref().unwrap();
    let zips = zips.as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(zips.values().to_vec(), vec![1050, 10115, 75001]);

    // Codes in the projected data index the exported arrays.
    let codes = dataset.batches()[0].codes(1).unwrap();
    assert_eq!(codes.as_slice(), &[2, -1, 1, 2]);
    let city = dataset.categories().feature(1).unwrap();
    assert_eq!(city.null_count(), 1);
}

#[test]
fn export_requires_opt_in() {
    let batch = record_batch(vec![Some("a")], zips(vec![Some(0)], vec![1]));
    let dataset = EncodedDataset::from_batches(
        &[Batch::from_record_batch(&batch).unwrap()],
        &RecodeConfig::default(),
    )
    .unwrap();

    let handle = dataset.get_categories(false);
    assert!(!handle.is_enabled());
    assert_eq!(handle.to_arrow().unwrap_err(), CategoryError::ExportDisabled);

    // Asking again with opt-in works on the same data.
    assert_eq!(dataset.get_categories(true).to_arrow().unwrap().len(), 3);
}

#[test]
fn unnamed_container_exports_default_names() {
    let batch = Batch::new(vec![
        catcodes::CategoricalColumn::from_strs(&[Some("b"), Some("a")]).into(),
        catcodes::Column::Numeric(vec![1.0, 2.0]),
    ])
    .unwrap();
    let dataset = EncodedDataset::from_batches(&[batch], &RecodeConfig::default()).unwrap();
    let exported = dataset.get_categories(true).to_arrow().unwrap();
    assert_eq!(exported[0].0, "f0");
    assert_eq!(exported[1].0, "f1");
    assert_eq!(as_strings(exported[0].1.as_ref().unwrap()), ["a", "b"]);
}
