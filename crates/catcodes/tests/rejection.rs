//! Data that does not fit a frozen schema is rejected as a whole.

use catcodes::{
    Batch, CategoricalColumn, CategoryError, CategoryValue, Column, EncodedDataset, FeatureId,
    Projection, RecodeConfig, Recoder, SchemaError,
};
use rstest::{fixture, rstest};

/// Feature 0 numeric, feature 1 categorical over `["abc", "cdef"]`.
#[fixture]
fn recoder() -> Recoder {
    let train = Batch::new(vec![
        Column::Numeric(vec![1.0, 2.0, 3.0]),
        CategoricalColumn::from_strs(&[Some("cdef"), Some("abc"), None]).into(),
    ])
    .unwrap()
    .with_feature_names(["x", "city"])
    .unwrap();
    EncodedDataset::from_batches(&[train], &RecodeConfig::default())
        .unwrap()
        .recoder()
}

fn frame(x: Column, city: Column) -> Batch {
    Batch::new(vec![x, city]).unwrap()
}

fn numeric(n: usize) -> Column {
    Column::Numeric(vec![0.5; n])
}

#[rstest]
#[case::forward(&[Some("abc"), Some("cdef")], &[0, 1])]
#[case::backward(&[Some("cdef"), Some("abc")], &[1, 0])]
#[case::with_missing(&[None, Some("cdef"), Some("cdef")], &[-1, 1, 1])]
fn known_values_project(
    recoder: Recoder,
    #[case] values: &[Option<&str>],
    #[case] expected: &[i32],
) {
    let batch = frame(numeric(values.len()), CategoricalColumn::from_strs(values).into());
    let projected = recoder.project(&batch).unwrap();
    assert_eq!(projected.codes(1).unwrap().as_slice(), expected);
    assert!(projected.codes(0).is_none());
}

#[rstest]
fn unseen_value_fails_with_feature_and_value(recoder: Recoder) {
    let batch = frame(
        numeric(3),
        CategoricalColumn::from_strs(&[Some("abc"), Some("def"), Some("cdef")]).into(),
    );
    let err = recoder.project(&batch).unwrap_err();
    assert_eq!(
        err,
        CategoryError::UnseenCategory {
            feature: FeatureId::named(1, "city"),
            value: CategoryValue::from("def"),
        }
    );
    let message = err.to_string();
    assert!(message.contains("not in the training set"), "{message}");
    assert!(message.contains("city"), "{message}");
}

#[rstest]
fn unseen_value_after_nul_suffix(recoder: Recoder) {
    let batch = frame(numeric(1), CategoricalColumn::from_bytes(&[Some(b"abc\0".as_slice())]).into());
    assert!(matches!(
        recoder.project(&batch),
        Err(CategoryError::UnseenCategory { .. })
    ));
}

#[rstest]
fn numeric_where_categorical_expected(recoder: Recoder) {
    let batch = frame(numeric(2), numeric(2));
    let err = recoder.project(&batch).unwrap_err();
    assert!(matches!(&err, CategoryError::TypeMismatch { feature, .. } if feature.index == 1));
    assert!(err.to_string().contains("data type doesn't match"));
}

#[rstest]
fn categorical_where_numeric_expected(recoder: Recoder) {
    let batch = frame(
        CategoricalColumn::from_strs(&[Some("abc")]).into(),
        CategoricalColumn::from_strs(&[Some("abc")]).into(),
    );
    assert!(matches!(
        recoder.project(&batch),
        Err(CategoryError::TypeMismatch { feature, .. }) if feature.index == 0
    ));
}

#[rstest]
fn integer_dictionary_against_string_schema(recoder: Recoder) {
    let batch = frame(numeric(1), CategoricalColumn::from_ints(&[Some(0)]).into());
    assert!(matches!(
        recoder.project(&batch),
        Err(CategoryError::TypeMismatch { .. })
    ));
}

/// Feature 0 holds an unseen value, feature 1 a type mismatch. The type
/// check runs for every feature before any lookup.
#[test]
fn type_checks_precede_lookups() {
    let train = Batch::new(vec![
        CategoricalColumn::from_strs(&[Some("a")]).into(),
        CategoricalColumn::from_strs(&[Some("b")]).into(),
    ])
    .unwrap();
    let recoder = EncodedDataset::from_batches(&[train], &RecodeConfig::default())
        .unwrap()
        .recoder();

    let batch = frame(CategoricalColumn::from_strs(&[Some("zzz")]).into(), numeric(1));
    assert!(matches!(
        recoder.project(&batch),
        Err(CategoryError::TypeMismatch { feature, .. }) if feature.index == 1
    ));
}

#[rstest]
fn feature_count_mismatch(recoder: Recoder) {
    let batch = Batch::new(vec![numeric(1)]).unwrap();
    assert_eq!(
        recoder.project(&batch).unwrap_err(),
        CategoryError::Schema(SchemaError::FeatureCountMismatch {
            expected: 2,
            found: 1
        })
    );
}

#[rstest]
fn feature_name_mismatch(recoder: Recoder) {
    let batch = frame(numeric(1), CategoricalColumn::from_strs(&[Some("abc")]).into())
        .with_feature_names(["x", "town"])
        .unwrap();
    assert!(matches!(
        recoder.project(&batch),
        Err(CategoryError::Schema(SchemaError::FeatureNameMismatch { index: 1, .. }))
    ));
}

#[rstest]
fn validate_does_not_look_up_values(recoder: Recoder) {
    let batch = frame(numeric(1), CategoricalColumn::from_strs(&[Some("def")]).into());
    assert!(recoder.validate(&batch).is_ok());
    assert!(recoder.validate(&frame(numeric(1), numeric(1))).is_err());
}

#[rstest]
#[should_panic(expected = "trusted projection")]
fn trusted_projection_of_foreign_data_panics(recoder: Recoder) {
    let batch = frame(numeric(1), CategoricalColumn::from_strs(&[Some("def")]).into());
    let _ = recoder.project_batch(&batch, Projection::Trusted);
}

#[test]
fn reference_dataset_fails_as_a_whole() {
    let config = RecodeConfig::default();
    let train = Batch::new(vec![CategoricalColumn::from_strs(&[Some("a")]).into()]).unwrap();
    let train = EncodedDataset::from_batches(&[train], &config).unwrap();

    let good = Batch::new(vec![CategoricalColumn::from_strs(&[Some("a")]).into()]).unwrap();
    let bad = Batch::new(vec![CategoricalColumn::from_strs(&[Some("b")]).into()]).unwrap();
    let result = EncodedDataset::with_reference(&[good, bad], train.categories(), &config);
    assert!(matches!(result, Err(CategoryError::UnseenCategory { .. })));
}

#[test]
fn container_project_shortcut() {
    let batch = Batch::new(vec![CategoricalColumn::from_ints(&[Some(4), Some(2)]).into()]).unwrap();
    let container =
        catcodes::CategoryContainer::from_batches(&[batch.clone()], &RecodeConfig::default())
            .unwrap();
    let projected = container.project(&batch, true).unwrap();
    assert_eq!(projected.codes(0).unwrap().as_slice(), &[1, 0]);

    let other = Batch::new(vec![CategoricalColumn::from_ints(&[Some(3)]).into()]).unwrap();
    assert!(container.project(&other, true).is_err());
}
