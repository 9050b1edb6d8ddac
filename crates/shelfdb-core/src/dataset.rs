//! Delimited-text dataset loader.
//!
//! Reads a header row plus records into [`SourceRow`]s, applying column
//! drops and renames, skipping malformed rows and truncating to a maximum
//! row count. Latin-1 input is decoded byte-for-byte.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{ColumnKind, RecordSchema, SourceRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    #[serde(alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
    /// `(from, to)` column renames applied after reading the header.
    pub renames: Vec<(String, String)>,
    /// Columns removed by their original header name.
    pub drop_columns: Vec<String>,
    pub max_rows: Option<usize>,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self { delimiter: b',', encoding: Encoding::Utf8, renames: Vec::new(), drop_columns: Vec::new(), max_rows: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Kept column names after drops and renames, in file order.
    pub columns: Vec<String>,
    pub rows: Vec<SourceRow>,
    /// Rows rejected as malformed.
    pub skipped: usize,
}

impl Dataset {
    /// Schema fields with no matching column; these will be written as `"nan"`.
    pub fn missing_columns<'a>(&self, schema: &'a RecordSchema) -> Vec<&'a str> {
        schema.field_names().filter(|f| !self.columns.iter().any(|c| c == f)).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    options: DatasetOptions,
}

impl DatasetLoader {
    pub fn new(options: DatasetOptions) -> Self { Self { options } }

    pub fn load_path(&self, path: &Path) -> Result<Dataset> {
        let file = File::open(path).map_err(|e| Error::Dataset(format!("cannot open {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "loading dataset");
        self.load_reader(file)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Dataset> {
        let opts = &self.options;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(opts.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header = reader.byte_headers()?.clone();
        if header.is_empty() {
            return Err(Error::Dataset("dataset has no header row".to_string()));
        }
        // `None` marks a dropped column.
        let names: Vec<Option<String>> = header
            .iter()
            .map(|raw| {
                let original = opts.encoding.decode(raw).trim().to_string();
                if opts.drop_columns.iter().any(|d| *d == original) {
                    return None;
                }
                let renamed = opts.renames.iter().find(|(from, _)| *from == original).map(|(_, to)| to.clone());
                Some(renamed.unwrap_or(original))
            })
            .collect();
        let columns: Vec<String> = names.iter().flatten().cloned().collect();
        debug!(?columns, "dataset columns");

        // Raw cells of kept columns; `None` for cells a short row lacks.
        let mut cells: Vec<Vec<Option<String>>> = Vec::new();
        let mut skipped = 0usize;
        let mut record = csv::ByteRecord::new();
        loop {
            if opts.max_rows.is_some_and(|max| cells.len() >= max) {
                break;
            }
            match reader.read_byte_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable row");
                    skipped += 1;
                    continue;
                }
            }
            if record.len() > header.len() {
                let line = record.position().map_or(0, csv::Position::line);
                warn!(line, fields = record.len(), expected = header.len(), "skipping malformed row");
                skipped += 1;
                continue;
            }
            let row = names
                .iter()
                .enumerate()
                .filter(|(_, name)| name.is_some())
                .map(|(idx, _)| record.get(idx).map(|raw| opts.encoding.decode(raw)))
                .collect();
            cells.push(row);
        }

        let kinds: Vec<ColumnKind> = (0..columns.len())
            .map(|col| ColumnKind::infer(cells.iter().map(|row| row[col].as_deref())))
            .collect();
        debug!(?kinds, "column types");
        let rows: Vec<SourceRow> = cells
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(&kinds)
                    .zip(row)
                    .map(|((name, kind), cell)| (name.clone(), kind.parse(cell.as_deref())))
                    .collect()
            })
            .collect();

        info!(rows = rows.len(), skipped, "dataset loaded");
        Ok(Dataset { columns, rows, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn opts() -> DatasetOptions {
        DatasetOptions {
            delimiter: b';',
            encoding: Encoding::Latin1,
            renames: vec![("Book-Title".into(), "book_title".into())],
            drop_columns: vec!["ISBN".into()],
            max_rows: None,
        }
    }

    #[test]
    fn renames_and_drops_columns() {
        let data = "ISBN;Book-Title;Year\n123;Dune;1965\n";
        let ds = DatasetLoader::new(opts()).load_reader(data.as_bytes()).expect("load");
        assert_eq!(ds.columns, vec!["book_title", "Year"]);
        assert_eq!(ds.rows.len(), 1);
        assert_eq!(ds.rows[0].get("book_title"), Some(&FieldValue::Text("Dune".into())));
        assert_eq!(ds.rows[0].get("Year"), Some(&FieldValue::Integer(1965)));
        assert!(ds.rows[0].get("ISBN").is_none());
    }

    #[test]
    fn numeric_looking_text_survives_in_text_columns() {
        let data = "ISBN;Book-Title;Publisher;Year\n1;007;1e3;1965\n2;Dune;Ace;\n";
        let ds = DatasetLoader::new(opts()).load_reader(data.as_bytes()).expect("load");
        assert_eq!(ds.rows[0].get("book_title"), Some(&FieldValue::Text("007".into())));
        assert_eq!(ds.rows[0].get("Publisher"), Some(&FieldValue::Text("1e3".into())));
        assert_eq!(ds.rows[0].get("Year"), Some(&FieldValue::Float(1965.0)));
        assert_eq!(ds.rows[1].get("Year"), Some(&FieldValue::Missing));
    }

    #[test]
    fn skips_rows_with_extra_fields_and_pads_short_rows() {
        let data = "ISBN;Book-Title;Year\n1;A;2000\n2;B;2001;extra\n3;C\n";
        let ds = DatasetLoader::new(opts()).load_reader(data.as_bytes()).expect("load");
        assert_eq!(ds.skipped, 1);
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[1].get("Year"), Some(&FieldValue::Missing));
    }

    #[test]
    fn truncates_after_skipping() {
        let data = "ISBN;Book-Title;Year\n1;A;1\n2;B;2;x\n3;C;3\n4;D;4\n";
        let mut o = opts();
        o.max_rows = Some(2);
        let ds = DatasetLoader::new(o).load_reader(data.as_bytes()).expect("load");
        let titles: Vec<_> = ds.rows.iter().map(|r| r.get("book_title").cloned()).collect();
        assert_eq!(titles, vec![Some(FieldValue::from("A")), Some(FieldValue::from("C"))]);
        assert_eq!(ds.skipped, 1);
    }

    #[test]
    fn decodes_latin1_bytes() {
        let mut data = b"ISBN;Book-Title;Year\n1;Caf".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b";2000\n");
        let ds = DatasetLoader::new(opts()).load_reader(data.as_slice()).expect("load");
        assert_eq!(ds.rows[0].get("book_title"), Some(&FieldValue::Text("Café".into())));
    }

    #[test]
    fn reports_missing_schema_columns() {
        use crate::types::DataType;
        let ds = DatasetLoader::new(opts()).load_reader("Book-Title\nDune\n".as_bytes()).expect("load");
        let schema = RecordSchema::new("Book", "")
            .with_field("book_title", DataType::Text, "")
            .with_field("publisher", DataType::Text, "");
        assert_eq!(ds.missing_columns(&schema), vec!["publisher"]);
    }
}
