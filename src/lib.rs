//! # DOCX Photo Sheet
//!
//! Converts the data table of a Word document (`.docx`) into a spreadsheet
//! (`.xlsx`) and turns its photo column into public image links.
//!
//! ## Pipeline
//!
//! 1. The document is loaded and its top-level tables are parsed.
//! 2. The first table with at least three columns is selected and its first
//!    row is checked for column names.
//! 3. The destination folder is looked up or created once.
//! 4. Each photo cell goes through the fallback chain: the embedded picture is
//!    uploaded, else the linked image is downloaded and uploaded, else the link
//!    is kept, else the cell text is kept.
//! 5. The resolved rows are written as a single-sheet workbook.
//!
//! Storage, downloads and spreadsheet output are reached through the
//! [`StorageProvider`], [`Fetcher`] and [`SpreadsheetWriter`] traits.
pub mod cell;
pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod helpers;
pub mod layout;
pub mod resolve;
pub mod spreadsheet;
pub mod storage;

#[cfg(test)]
mod testing;

pub use crate::config::Config;
pub use crate::error::ConvertError;
pub use crate::fetch::Fetcher;
pub use crate::fetch::HttpFetcher;
pub use crate::spreadsheet::SpreadsheetWriter;
pub use crate::spreadsheet::XlsxWriter;
pub use crate::storage::DriveStorage;
pub use crate::storage::ImagePublisher;
pub use crate::storage::StorageProvider;

use crate::cell::CellContent;
use crate::cell::DocxCell;
use crate::document::Document;
use crate::layout::detect_header;
use crate::layout::select_table;
use crate::resolve::Resolution;
use crate::resolve::RowResolver;
use crate::spreadsheet::OutputTable;

/// Counters of a finished conversion
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Data rows written
    pub rows: usize,
    /// Header of the photo column, if one was found
    pub photo_column: Option<String>,
    /// Embedded pictures uploaded
    pub embedded: usize,
    /// Linked images downloaded and uploaded
    pub fetched: usize,
    /// Links kept because their image could not be downloaded
    pub links_kept: usize,
}

impl Summary {
    pub fn uploads(&self) -> usize {
        self.embedded + self.fetched
    }

    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Embedded(_) => self.embedded += 1,
            Resolution::Fetched { .. } => self.fetched += 1,
            Resolution::LinkKept(_) => self.links_kept += 1,
            Resolution::Passthrough => (),
        }
    }
}

/// Builds the output table of a loaded document.
///
/// Fails without touching storage when the document has no tables. The
/// destination folder is resolved once, before any row is processed, and
/// storage failures abort the conversion.
pub fn convert_document<S, F>(
    document: &Document,
    config: &Config,
    publisher: &ImagePublisher<S>,
    fetcher: &F,
) -> Result<(OutputTable, Summary), ConvertError>
where
    S: StorageProvider,
    F: Fetcher,
{
    let table = select_table(document.tables())
        .ok_or_else(|| ConvertError::NoTablesError(document.name.to_owned()))?;
    let layout = detect_header(table, &config.photo_header_candidates);
    tracing::info!(
        columns = layout.headers.len(),
        header_row = layout.data_start == 1,
        photo_column = ?layout.photo_column.map(|index| &layout.headers[index]),
        "table selected"
    );

    let folder_id = publisher.find_or_create_folder(&config.folder_name)?;
    let resolver = RowResolver::new(publisher, fetcher, &folder_id);

    let mut output = OutputTable::new(layout.headers.clone());
    let mut summary = Summary {
        photo_column: layout.photo_column.map(|index| layout.headers[index].to_owned()),
        ..Summary::default()
    };
    for (index, row) in table.rows().iter().skip(layout.data_start).enumerate() {
        let row_number = index + 1;
        let cells: Vec<DocxCell> = row.cells().iter().map(|cell| DocxCell::new(cell, document)).collect();
        let mut values: Vec<String> = cells.iter().map(|cell| cell.text()).collect();

        if let Some(column) = layout.photo_column.filter(|column| *column < cells.len()) {
            let resolution = resolver.resolve(row_number, &cells[column])?;
            summary.record(&resolution);
            let original = std::mem::take(&mut values[column]);
            values[column] = resolution.into_value(original);
        }
        output.push(values);
        summary.rows += 1;
    }
    Ok((output, summary))
}

/// Converts the document at `config.input_path` and writes `config.output_path`.
///
/// Nothing is written when any step fails.
pub fn convert<S, F, W>(
    config: &Config,
    publisher: &ImagePublisher<S>,
    fetcher: &F,
    writer: &W,
) -> Result<Summary, ConvertError>
where
    S: StorageProvider,
    F: Fetcher,
    W: SpreadsheetWriter,
{
    let document = Document::open(&config.input_path)?;
    let (output, summary) = convert_document(&document, config, publisher, fetcher)?;
    writer.write(&config.output_path, &output)?;
    tracing::info!(
        output = %config.output_path.display(),
        rows = summary.rows,
        uploads = summary.uploads(),
        links_kept = summary.links_kept,
        "conversion finished"
    );
    Ok(summary)
}
