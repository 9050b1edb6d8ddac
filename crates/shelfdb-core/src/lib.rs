#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod books;
pub mod config;
pub mod dataset;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ColumnKind, DataType, FieldDef, FieldValue, RecordSchema, SourceRow, TargetRecord};
