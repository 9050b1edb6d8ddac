//! Mapping between collection schemas and Arrow schemas.
//!
//! The collection description is kept in the Arrow schema metadata and each
//! field description in the field metadata, so a table's definition can be
//! read back from LanceDB without a side table.

use arrow_schema::{DataType as ArrowType, Field, Schema};
use shelfdb_core::{DataType, FieldDef, RecordSchema};
use std::collections::HashMap;
use std::sync::Arc;

pub const DESCRIPTION_KEY: &str = "description";

pub fn arrow_type(data_type: DataType) -> ArrowType {
    match data_type {
        DataType::Text => ArrowType::Utf8,
        DataType::Int => ArrowType::Int64,
        DataType::Number => ArrowType::Float64,
        DataType::Boolean => ArrowType::Boolean,
    }
}

fn data_type_of(arrow: &ArrowType) -> DataType {
    match arrow {
        ArrowType::Int8 | ArrowType::Int16 | ArrowType::Int32 | ArrowType::Int64
        | ArrowType::UInt8 | ArrowType::UInt16 | ArrowType::UInt32 | ArrowType::UInt64 => DataType::Int,
        ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => DataType::Number,
        ArrowType::Boolean => DataType::Boolean,
        _ => DataType::Text,
    }
}

pub fn build_arrow_schema(schema: &RecordSchema) -> Arc<Schema> {
    let fields: Vec<Field> = schema
        .fields
        .iter()
        .map(|f| {
            Field::new(&f.name, arrow_type(f.data_type), true)
                .with_metadata(HashMap::from([(DESCRIPTION_KEY.to_string(), f.description.clone())]))
        })
        .collect();
    let metadata = HashMap::from([(DESCRIPTION_KEY.to_string(), schema.description.clone())]);
    Arc::new(Schema::new_with_metadata(fields, metadata))
}

pub fn record_schema_from_arrow(name: &str, arrow: &Schema) -> RecordSchema {
    let fields = arrow
        .fields()
        .iter()
        .map(|f| FieldDef {
            name: f.name().clone(),
            data_type: data_type_of(f.data_type()),
            description: f.metadata().get(DESCRIPTION_KEY).cloned().unwrap_or_default(),
        })
        .collect();
    RecordSchema {
        name: name.to_string(),
        description: arrow.metadata().get(DESCRIPTION_KEY).cloned().unwrap_or_default(),
        fields,
    }
}
