//! Arrow `RecordBatch` conversion.
//!
//! Dictionary-encoded columns become categorical columns; numeric primitive
//! columns become numeric columns.
//!
//! # Supported column types
//!
//! - `Dictionary(<signed or unsigned int>, Utf8 | LargeUtf8 | Binary | LargeBinary | Int32 | Int64)`
//! - `Float32`, `Float64`, `Int32`, `Int64` (numeric, nulls become `NaN`)

use arrow::array::{
    Array, BinaryArray, DictionaryArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeBinaryArray, LargeStringArray, StringArray,
};
use arrow::datatypes::{
    ArrowDictionaryKeyType, ArrowNativeType, DataType, Int8Type, Int16Type, Int32Type, Int64Type,
    UInt8Type, UInt16Type, UInt32Type,
};
use arrow::record_batch::RecordBatch;

use crate::error::SchemaError;

use super::batch::Batch;
use super::column::{CategoricalColumn, Column, Dictionary};

impl Batch {
    /// Convert an Arrow record batch, keeping the field names as feature names.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Batch, SchemaError> {
        let schema = batch.schema();
        let mut columns = Vec::with_capacity(batch.num_columns());
        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            columns.push(convert_column(field.name(), array.as_ref())?);
        }
        let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
        Batch::new(columns)?.with_feature_names(names)
    }
}

fn convert_column(name: &str, array: &dyn Array) -> Result<Column, SchemaError> {
    match array.data_type() {
        DataType::Dictionary(key, _) => {
            let column = match key.as_ref() {
                DataType::Int8 => dictionary_column::<Int8Type>(name, array)?,
                DataType::Int16 => dictionary_column::<Int16Type>(name, array)?,
                DataType::Int32 => dictionary_column::<Int32Type>(name, array)?,
                DataType::Int64 => dictionary_column::<Int64Type>(name, array)?,
                DataType::UInt8 => dictionary_column::<UInt8Type>(name, array)?,
                DataType::UInt16 => dictionary_column::<UInt16Type>(name, array)?,
                DataType::UInt32 => dictionary_column::<UInt32Type>(name, array)?,
                _ => return Err(unsupported(name, array.data_type())),
            };
            Ok(Column::Categorical(column))
        }
        DataType::Float32 => {
            let arr = downcast::<Float32Array>(name, array)?;
            Ok(Column::Numeric(
                arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect(),
            ))
        }
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(name, array)?;
            Ok(Column::Numeric(
                arr.iter().map(|v| v.map_or(f32::NAN, |x| x as f32)).collect(),
            ))
        }
        DataType::Int32 => {
            let arr = downcast::<Int32Array>(name, array)?;
            Ok(Column::Numeric(
                arr.iter().map(|v| v.map_or(f32::NAN, |x| x as f32)).collect(),
            ))
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(name, array)?;
            Ok(Column::Numeric(
                arr.iter().map(|v| v.map_or(f32::NAN, |x| x as f32)).collect(),
            ))
        }
        other => Err(unsupported(name, other)),
    }
}

fn dictionary_column<K: ArrowDictionaryKeyType>(
    name: &str,
    array: &dyn Array,
) -> Result<CategoricalColumn, SchemaError> {
    let dict = downcast::<DictionaryArray<K>>(name, array)?;
    let values = dict.values();

    let dictionary = match values.data_type() {
        DataType::Utf8 => {
            let v = downcast::<StringArray>(name, values.as_ref())?;
            Dictionary::Bytes((0..v.len()).map(|i| v.value(i).as_bytes().into()).collect())
        }
        DataType::LargeUtf8 => {
            let v = downcast::<LargeStringArray>(name, values.as_ref())?;
            Dictionary::Bytes((0..v.len()).map(|i| v.value(i).as_bytes().into()).collect())
        }
        DataType::Binary => {
            let v = downcast::<BinaryArray>(name, values.as_ref())?;
            Dictionary::Bytes((0..v.len()).map(|i| v.value(i).into()).collect())
        }
        DataType::LargeBinary => {
            let v = downcast::<LargeBinaryArray>(name, values.as_ref())?;
            Dictionary::Bytes((0..v.len()).map(|i| v.value(i).into()).collect())
        }
        DataType::Int64 => {
            let v = downcast::<Int64Array>(name, values.as_ref())?;
            Dictionary::Int(v.values().to_vec())
        }
        DataType::Int32 => {
            let v = downcast::<Int32Array>(name, values.as_ref())?;
            Dictionary::Int(v.values().iter().map(|&x| x as i64).collect())
        }
        other => return Err(unsupported(name, other)),
    };

    // Null keys and keys pointing at null dictionary entries are both missing.
    let mut codes = Vec::with_capacity(dict.len());
    for key in dict.keys().iter() {
        let code = match key {
            Some(k) => {
                let k = k.as_usize();
                if values.is_null(k) {
                    -1
                } else {
                    i32::try_from(k).map_err(|_| unsupported(name, array.data_type()))?
                }
            }
            None => -1,
        };
        codes.push(code);
    }
    CategoricalColumn::new(dictionary, codes)
}

fn downcast<'a, T: 'static>(name: &str, array: &'a dyn Array) -> Result<&'a T, SchemaError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| unsupported(name, array.data_type()))
}

fn unsupported(name: &str, data_type: &DataType) -> SchemaError {
    SchemaError::UnsupportedColumn {
        column: name.to_string(),
        data_type: format!("{:?}", data_type),
    }
}
