//! Table selection and header detection
use crate::cell::join_paragraphs;
use crate::document::Table;
use std::collections::HashSet;

/// Minimum number of columns for a table to be preferred as the data table
pub const MIN_DATA_COLUMNS: usize = 3;

/// Shape of the selected data table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLayout {
    /// Column names, one per column of the first row
    pub headers: Vec<String>,
    /// Index of the first data row (1 when the first row is a header, 0 otherwise)
    pub data_start: usize,
    /// 0-based index of the photo column, if any header names one
    pub photo_column: Option<usize>,
}

/// Picks the first table with at least [`MIN_DATA_COLUMNS`] columns, falling
/// back to the first table of the document
pub fn select_table(tables: &[Table]) -> Option<&Table> {
    tables
        .iter()
        .find(|table| table.column_count() >= MIN_DATA_COLUMNS)
        .or_else(|| tables.first())
}

/// Synthetic header name for a 0-based column index
pub fn column_name(index: usize) -> String {
    format!("Column {}", index + 1)
}

/// Whether enough header cells are non-empty for the row to be column names:
/// at least 60% of the columns (rounded down), and never fewer than one
pub fn is_header_like<S: AsRef<str>>(headers: &[S]) -> bool {
    let filled = headers.iter().filter(|header| !header.as_ref().trim().is_empty()).count();
    let required = (headers.len() * 3 / 5).max(1);
    filled >= required
}

/// Finds the first header matching one of the candidate names, ignoring case and surrounding whitespace
pub fn find_photo_column<S: AsRef<str>>(headers: &[S], candidates: &HashSet<String>) -> Option<usize> {
    let candidates: HashSet<String> = candidates
        .iter()
        .map(|candidate| candidate.trim().to_lowercase())
        .collect();
    headers
        .iter()
        .position(|header| candidates.contains(&header.as_ref().trim().to_lowercase()))
}

/// Derives column names and the photo column from the first row of a table
///
/// A header-like first row provides the names and is excluded from the data;
/// blank names inside it become `Column N`. Otherwise every row is data and all
/// names are synthetic.
pub fn detect_header(table: &Table, candidates: &HashSet<String>) -> TableLayout {
    let first_row: Vec<String> = table.rows()
        .first()
        .map(|row| row.cells().iter().map(|cell| join_paragraphs(cell.paragraphs())).collect())
        .unwrap_or_default();

    let (headers, data_start): (Vec<String>, usize) = if !first_row.is_empty() && is_header_like(first_row.as_slice()) {
        let headers = first_row
            .into_iter()
            .enumerate()
            .map(|(index, header)| if header.is_empty() { column_name(index) } else { header })
            .collect();
        (headers, 1)
    } else {
        ((0..first_row.len()).map(column_name).collect(), 0)
    };

    let photo_column = find_photo_column(headers.as_slice(), candidates);
    TableLayout { headers, data_start, photo_column }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Cell;
    use crate::document::Row;

    fn table(rows: &[&[&str]], column_count: usize) -> Table {
        Table {
            rows: rows
                .iter()
                .map(|cells| Row {
                    cells: cells
                        .iter()
                        .map(|text| Cell { paragraphs: vec![text.to_string()], ..Cell::default() })
                        .collect(),
                })
                .collect(),
            column_count,
        }
    }

    fn candidates() -> HashSet<String> {
        ["Photo", "Image", "Picture", "Photograph"].iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn wide_table_wins_regardless_of_order() {
        let narrow = table(&[&["a", "b"]], 2);
        let wide = table(&[&["a", "b", "c", "d", "e"]], 5);

        let tables = vec![narrow.clone(), wide.clone()];
        assert_eq!(select_table(&tables), Some(&tables[1]));
        let tables = vec![wide, narrow];
        assert_eq!(select_table(&tables), Some(&tables[0]));
    }

    #[test]
    fn falls_back_to_first_table() {
        let tables = vec![table(&[&["a"]], 1), table(&[&["a", "b"]], 2)];
        assert_eq!(select_table(&tables), Some(&tables[0]));
        assert_eq!(select_table(&[]), None);
    }

    #[test]
    fn header_threshold() {
        // 5 columns need 3 filled names
        assert!(is_header_like(&["a", "b", "c", "", ""]));
        assert!(!is_header_like(&["a", "b", "", "", ""]));
        // 1 column needs 1
        assert!(!is_header_like(&[""]));
        assert!(is_header_like(&["a"]));
        // 2 columns: 60% rounds down to 1
        assert!(is_header_like(&["", "b"]));
        assert!(!is_header_like(&["  ", ""]));
    }

    #[test]
    fn header_row_with_photo_column() {
        let table = table(&[&["Name", "Age", " PHOTO ", "Notes"], &["Ann", "31", "", ""]], 4);
        let layout = detect_header(&table, &candidates());

        assert_eq!(layout.headers, vec!["Name", "Age", "PHOTO", "Notes"]);
        assert_eq!(layout.data_start, 1);
        assert_eq!(layout.photo_column, Some(2));
    }

    #[test]
    fn sparse_first_row_is_data() {
        let table = table(&[&["", "", "Photo", "", ""], &["a", "b", "c", "d", "e"]], 5);
        let layout = detect_header(&table, &candidates());

        assert_eq!(layout.headers, vec!["Column 1", "Column 2", "Column 3", "Column 4", "Column 5"]);
        assert_eq!(layout.data_start, 0);
        assert_eq!(layout.photo_column, None);
    }

    #[test]
    fn blank_header_names_are_synthesized() {
        let table = table(&[&["Name", "", "Image", "Notes", "Age"]], 5);
        let layout = detect_header(&table, &candidates());

        assert_eq!(layout.headers, vec!["Name", "Column 2", "Image", "Notes", "Age"]);
        assert_eq!(layout.photo_column, Some(2));
    }

    #[test]
    fn first_matching_header_wins() {
        let headers = ["Picture", "Photo"];
        assert_eq!(find_photo_column(&headers, &candidates()), Some(0));
        assert_eq!(find_photo_column(&["Name", "Avatar"], &candidates()), None);
    }
}
