//! # Spreadsheet Output Module
//!
//! The resolved table handed to spreadsheet writers, and the writers
//! themselves. Column order is always the header order.
use std::path::Path;
use thiserror::Error;

pub(crate) mod reference;
pub mod xlsx;

pub use xlsx::XlsxWriter;

/// Error types of spreadsheet serialization
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot write spreadsheet: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cannot write spreadsheet package: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// A row does not have one value per header
    #[error("Row {row} has {found} values for {expected} columns")]
    RowWidthError { row: usize, expected: usize, found: usize },
}

/// One output row: a value per header, in header order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedRow {
    pub(crate) values: Vec<(String, String)>,
}

impl ResolvedRow {
    /// Pairs values with headers. Missing values become empty strings and
    /// values beyond the last header are dropped.
    pub fn new<S: AsRef<str>>(headers: &[S], mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        let values = headers
            .iter()
            .map(|header| header.as_ref().to_owned())
            .zip(values)
            .collect();
        ResolvedRow { values }
    }

    /// Value of the first column with this header
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(_, value)| value.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}

/// Headers plus resolved rows, ready to be serialized
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputTable {
    pub headers: Vec<String>,
    pub rows: Vec<ResolvedRow>,
}

impl OutputTable {
    pub fn new(headers: Vec<String>) -> Self {
        OutputTable { headers, rows: Vec::new() }
    }

    /// Appends a row built from raw cell values, padded or cut to the header count
    pub fn push(&mut self, values: Vec<String>) {
        let row = ResolvedRow::new(self.headers.as_slice(), values);
        self.rows.push(row);
    }

    /// Checks that every row has exactly one value per header
    pub fn validate(&self) -> Result<(), SpreadsheetError> {
        match self.rows.iter().position(|row| row.len() != self.headers.len()) {
            Some(index) => Err(SpreadsheetError::RowWidthError {
                row: index + 1,
                expected: self.headers.len(),
                found: self.rows[index].len(),
            }),
            None => Ok(()),
        }
    }
}

/// Serializes an output table to a file
pub trait SpreadsheetWriter {
    fn write(&self, path: &Path, table: &OutputTable) -> Result<(), SpreadsheetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn rows_are_padded_and_cut() {
        let mut table = OutputTable::new(strings(&["Name", "Age", "Photo"]));
        table.push(strings(&["Ann"]));
        table.push(strings(&["Bob", "40", "x", "extra"]));

        assert_eq!(table.rows[0].values().collect::<Vec<_>>(), vec!["Ann", "", ""]);
        assert_eq!(table.rows[1].values().collect::<Vec<_>>(), vec!["Bob", "40", "x"]);
        assert_eq!(table.rows[1].get("Photo"), Some("x"));
        assert_eq!(table.rows[1].get("Notes"), None);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn duplicate_headers_keep_both_columns() {
        let row = ResolvedRow::new(&["Name", "Name"], strings(&["first", "second"]));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("Name"), Some("first"));
    }

    #[test]
    fn validate_reports_first_bad_row() {
        let mut table = OutputTable::new(strings(&["A", "B"]));
        table.push(strings(&["1", "2"]));
        table.rows.push(ResolvedRow::new(&["A"], strings(&["3"])));

        let error = table.validate().unwrap_err();
        assert!(matches!(error, SpreadsheetError::RowWidthError { row: 2, expected: 2, found: 1 }));
    }
}
