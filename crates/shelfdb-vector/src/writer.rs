//! Conversion of normalized records into typed Arrow record batches.

use arrow_array::{ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType as ArrowType, Schema};
use shelfdb_core::types::MISSING;
use shelfdb_core::TargetRecord;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

pub(crate) fn parse_int(field: &str, raw: &str) -> StoreResult<Option<i64>> {
    if raw == MISSING {
        return Ok(None);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Some(i));
    }
    // Integral floats such as "1999.0" come from columns holding missing values.
    match raw.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Some(f as i64)),
        _ => Err(StoreError::Rejected(format!("field '{field}': '{raw}' is not an integer"))),
    }
}

pub(crate) fn parse_number(field: &str, raw: &str) -> StoreResult<Option<f64>> {
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| StoreError::Rejected(format!("field '{field}': '{raw}' is not a number")))
}

pub(crate) fn parse_bool(field: &str, raw: &str) -> StoreResult<Option<bool>> {
    match raw {
        MISSING => Ok(None),
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(StoreError::Rejected(format!("field '{field}': '{raw}' is not a boolean"))),
    }
}

/// Build one record batch with a column per schema field, in record order.
pub fn records_to_record_batch(schema: Arc<Schema>, records: &[TargetRecord]) -> StoreResult<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let name = field.name();
        let raw: Vec<Option<&str>> = records.iter().map(|r| r.get(name)).collect();
        let column: ArrayRef = match field.data_type() {
            ArrowType::Int64 => {
                let values = raw.iter().map(|v| v.map_or(Ok(None), |s| parse_int(name, s))).collect::<StoreResult<Vec<_>>>()?;
                Arc::new(Int64Array::from(values))
            }
            ArrowType::Float64 => {
                let values = raw.iter().map(|v| v.map_or(Ok(None), |s| parse_number(name, s))).collect::<StoreResult<Vec<_>>>()?;
                Arc::new(Float64Array::from(values))
            }
            ArrowType::Boolean => {
                let values = raw.iter().map(|v| v.map_or(Ok(None), |s| parse_bool(name, s))).collect::<StoreResult<Vec<_>>>()?;
                Arc::new(BooleanArray::from(values))
            }
            ArrowType::Utf8 => Arc::new(StringArray::from(raw)),
            other => {
                return Err(StoreError::Rejected(format!("field '{name}' has unsupported column type {other}")));
            }
        };
        columns.push(column);
    }
    RecordBatch::try_new(schema, columns).map_err(|e| StoreError::Rejected(e.to_string()))
}
