//! Record-oriented tabular data: loading from CSV or spreadsheet workbooks,
//! and re-exporting as UTF-8 CSV.

use std::io;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read file: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("CSV parsing failed: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },
    #[error("workbook parsing failed: {source}")]
    Workbook {
        #[from]
        source: calamine::Error,
    },
    #[error("the file contains no worksheets")]
    NoWorksheet,
    #[error("the file is empty")]
    Empty,
    #[error("unsupported file extension '{extension}' (expected csv, xlsx or xls)")]
    UnsupportedExtension { extension: String },
}

/// An in-memory table: one header row plus string-valued records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Loads a table from a path, dispatching on the file extension.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Self::from_csv_path(path),
            "xlsx" | "xls" | "ods" => Self::from_workbook_path(path),
            other => Err(TableError::UnsupportedExtension {
                extension: other.to_string(),
            }),
        }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: io::Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty() && rows.is_empty()) {
            return Err(TableError::Empty);
        }
        Ok(Self::new(headers, rows))
    }

    /// Reads the first worksheet of an `.xlsx`/`.xls`/`.ods` workbook. The
    /// first row becomes the header; every cell is rendered as text.
    pub fn from_workbook_path(path: &Path) -> Result<Self, TableError> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(TableError::NoWorksheet)?;
        let range = workbook.worksheet_range(&sheet_name)?;
        let mut iter = range.rows();
        let headers = match iter.next() {
            Some(row) => row.iter().map(cell_to_string).collect::<Vec<_>>(),
            None => return Err(TableError::Empty),
        };
        let rows = iter
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(Self::new(headers, rows))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of the column named `name`, matched exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Serialises the table as UTF-8 CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<(), TableError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_with_headers() {
        let data = "name,email\nAlice,alice@example.com\nBob,bob@example.com\n";
        let table = Table::from_csv_reader(data.as_bytes()).expect("parse");
        assert_eq!(table.headers, vec!["name", "email"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("email"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = Table::from_csv_reader("".as_bytes()).expect_err("must fail");
        assert!(matches!(err, TableError::Empty));
    }

    #[test]
    fn csv_round_trip_preserves_shape() {
        let table = Table::new(
            vec!["email".into(), "note".into()],
            vec![
                vec!["a@example.com".into(), "first".into()],
                vec!["b@example.com".into(), "with,comma".into()],
            ],
        );
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).expect("write");
        let reparsed = Table::from_csv_reader(buffer.as_slice()).expect("reparse");
        assert_eq!(reparsed, table);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = Table::from_path(Path::new("emails.pdf")).expect_err("must fail");
        assert!(matches!(err, TableError::UnsupportedExtension { .. }));
    }
}
