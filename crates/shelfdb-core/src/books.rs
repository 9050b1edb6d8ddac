//! Built-in defaults for the book catalogue import.

use crate::dataset::{DatasetOptions, Encoding};
use crate::types::{DataType, RecordSchema};

pub const BOOK_COLLECTION: &str = "Book";

pub const BOOK_DROPPED_COLUMNS: &[&str] = &["ISBN", "Image-URL-S", "Image-URL-M", "Image-URL-L"];

pub const BOOK_COLUMN_RENAMES: &[(&str, &str)] = &[
    ("Book-Title", "book_title"),
    ("Book-Author", "book_author"),
    ("Year-Of-Publication", "year_of_publication"),
    ("Publisher", "publisher"),
];

pub const BOOK_MAX_ROWS: usize = 1000;

pub fn book_schema() -> RecordSchema {
    RecordSchema::new(BOOK_COLLECTION, "A collection of books with title, author, year of publication, and publisher")
        .with_field("book_title", DataType::Text, "The title of the book")
        .with_field("book_author", DataType::Text, "The author of the book")
        .with_field("year_of_publication", DataType::Text, "The year in which the book was published")
        .with_field("publisher", DataType::Text, "The publisher of the book")
}

/// Semicolon-separated, latin-1 encoded export with image URL columns.
pub fn book_dataset_options() -> DatasetOptions {
    DatasetOptions {
        delimiter: b';',
        encoding: Encoding::Latin1,
        renames: BOOK_COLUMN_RENAMES.iter().map(|(from, to)| ((*from).to_string(), (*to).to_string())).collect(),
        drop_columns: BOOK_DROPPED_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        max_rows: Some(BOOK_MAX_ROWS),
    }
}
