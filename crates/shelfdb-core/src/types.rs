//! Domain types shared by the dataset loader, the store backends and the ingestor.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// Text written for values that are absent or not a number.
pub const MISSING: &str = "nan";

/// Cell texts a dataframe reader treats as missing.
const NA_MARKERS: &[&str] = &["NA", "N/A", "n/a", "#N/A", "NULL", "null", "NaN", "nan", "None", "<NA>"];

/// A raw value as read from the source dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Missing,
}

/// Whether raw cell text counts as a missing value.
pub fn is_na(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_MARKERS.contains(&trimmed)
}

/// Value type of a whole dataset column.
///
/// Decided once from every cell of the column, the way a dataframe reader
/// types its columns. A single non-numeric cell makes the column `Text`, and
/// text cells are then kept verbatim. An integer column with missing cells
/// becomes `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// `None` stands for a cell absent from a short row.
    pub fn infer<'a>(cells: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let (mut ints, mut floats) = (true, true);
        let (mut any_missing, mut any_value) = (false, false);
        for cell in cells {
            let Some(raw) = cell.filter(|c| !is_na(c)) else {
                any_missing = true;
                continue;
            };
            any_value = true;
            let trimmed = raw.trim();
            ints &= trimmed.parse::<i64>().is_ok();
            // `f64::from_str` also accepts "inf"/"infinity", which are titles here.
            floats &= trimmed.bytes().any(|b| b.is_ascii_digit()) && trimmed.parse::<f64>().is_ok();
            if !floats {
                return Self::Text;
            }
        }
        match (any_value, ints, any_missing) {
            (false, _, _) => Self::Text,
            (true, true, false) => Self::Integer,
            _ => Self::Float,
        }
    }

    /// Typed value of one cell of a column of this kind.
    pub fn parse(self, cell: Option<&str>) -> FieldValue {
        let Some(raw) = cell.filter(|c| !is_na(c)) else {
            return FieldValue::Missing;
        };
        let trimmed = raw.trim();
        match self {
            Self::Integer => trimmed.parse().map_or_else(|_| FieldValue::Text(raw.to_string()), FieldValue::Integer),
            Self::Float => trimmed.parse().map_or_else(|_| FieldValue::Text(raw.to_string()), FieldValue::Float),
            Self::Text => FieldValue::Text(raw.to_string()),
        }
    }
}

impl FieldValue {
    /// Canonical lowercase string form written to the store.
    pub fn normalized(&self) -> String {
        match self {
            Self::Text(s) => s.to_lowercase(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Missing => MISSING.to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        MISSING.to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

/// One input row: an ordered mapping from column name to raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    fields: Vec<(String, FieldValue)>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a column value, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Primitive data type of a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[serde(alias = "string")]
    Text,
    Int,
    Number,
    Boolean,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(alias = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, data_type: DataType, description: impl Into<String>) -> Self {
        Self { name: name.into(), data_type, description: description.into() }
    }
}

/// Declared shape of a destination collection.
///
/// Field order is significant: normalized records list their values in the
/// same order as `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), fields: Vec::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType, description: impl Into<String>) -> Self {
        self.fields.push(FieldDef::new(name, data_type, description));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check the collection name and that field names are non-empty and unique.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidSchema("collection name is empty".to_string()));
        }
        if self.fields.is_empty() {
            return Err(Error::InvalidSchema(format!("collection '{}' declares no fields", self.name)));
        }
        let mut seen = HashSet::new();
        for (pos, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(Error::InvalidSchema(format!("field #{pos} of '{}' has an empty name", self.name)));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::InvalidSchema(format!("duplicate field '{}' in '{}'", field.name, self.name)));
            }
        }
        Ok(())
    }

    /// Convert a source row into a record with exactly this schema's fields.
    ///
    /// Columns the schema does not name are dropped; schema fields the row
    /// lacks are written as `"nan"`.
    pub fn normalize(&self, row: &SourceRow) -> TargetRecord {
        let values = self
            .fields
            .iter()
            .map(|f| {
                let value = row.get(&f.name).map_or_else(|| MISSING.to_string(), FieldValue::normalized);
                (f.name.clone(), value)
            })
            .collect();
        TargetRecord { values }
    }
}

/// A normalized record ready for the store. Serializes as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    values: Vec<(String, String)>,
}

impl TargetRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl Serialize for TargetRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> RecordSchema {
        RecordSchema::new("Book", "books")
            .with_field("book_title", DataType::Text, "")
            .with_field("book_author", DataType::Text, "")
    }

    #[test]
    fn column_kind_is_decided_by_every_cell() {
        assert_eq!(ColumnKind::infer([Some("2002"), Some("1999")]), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer([Some("2002"), Some(""), None]), ColumnKind::Float);
        assert_eq!(ColumnKind::infer([Some("1.5"), Some("NaN")]), ColumnKind::Float);
        assert_eq!(ColumnKind::infer([Some("007"), Some("Dune")]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer([Some("Infinity")]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer([Some(""), None]), ColumnKind::Text);
    }

    #[test]
    fn text_columns_keep_cells_verbatim() {
        assert_eq!(ColumnKind::Text.parse(Some("007")), FieldValue::Text("007".into()));
        assert_eq!(ColumnKind::Text.parse(Some("1e3")), FieldValue::Text("1e3".into()));
        assert_eq!(ColumnKind::Text.parse(Some("n/a")), FieldValue::Missing);
        assert_eq!(ColumnKind::Float.parse(Some("1965")).normalized(), "1965.0");
        assert_eq!(ColumnKind::Integer.parse(Some(" 42 ")), FieldValue::Integer(42));
        assert_eq!(ColumnKind::Integer.parse(None), FieldValue::Missing);
    }

    #[test]
    fn normalized_forms() {
        assert_eq!(FieldValue::from("The HOBBIT").normalized(), "the hobbit");
        assert_eq!(FieldValue::Integer(1999).normalized(), "1999");
        assert_eq!(FieldValue::Float(1999.0).normalized(), "1999.0");
        assert_eq!(FieldValue::Float(2.25).normalized(), "2.25");
        assert_eq!(FieldValue::Float(f64::NAN).normalized(), "nan");
        assert_eq!(FieldValue::Missing.normalized(), "nan");
    }

    #[test]
    fn normalize_follows_schema_order_and_fills_missing() {
        let row = SourceRow::new().with("publisher", "Ace").with("book_title", "Dune");
        let record = schema().normalize(&row);
        let fields: Vec<_> = record.iter().collect();
        assert_eq!(fields, vec![("book_title", "dune"), ("book_author", "nan")]);
    }

    #[test]
    fn target_record_serializes_as_object() {
        let row = SourceRow::new().with("book_title", "Dune").with("book_author", "Herbert");
        let json = serde_json::to_string(&schema().normalize(&row)).expect("serialize");
        assert_eq!(json, r#"{"book_title":"dune","book_author":"herbert"}"#);
    }

    #[test]
    fn validate_rejects_duplicates_and_empty_names() {
        assert!(schema().validate().is_ok());
        let dup = schema().with_field("book_title", DataType::Text, "");
        assert!(matches!(dup.validate(), Err(Error::InvalidSchema(_))));
        let blank = RecordSchema::new("Book", "").with_field(" ", DataType::Text, "");
        assert!(blank.validate().is_err());
        assert!(RecordSchema::new("", "").with_field("a", DataType::Int, "").validate().is_err());
        assert!(RecordSchema::new("Book", "").validate().is_err());
    }

    #[test]
    fn data_type_accepts_string_alias() {
        let field: FieldDef = serde_json::from_str(r#"{"name":"t","type":"string"}"#).expect("parse");
        assert_eq!(field.data_type, DataType::Text);
        assert_eq!(field.description, "");
    }
}
