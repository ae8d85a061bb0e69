use thiserror::Error;

/// Main error type for the conversion pipeline.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("{0}")]
    WithContextError(String),

    #[error("No tables found in '{0}'")]
    NoTablesError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Pipeline module errors
    #[error("{0}")]
    DocumentError(#[from] crate::document::DocumentError),

    #[error("{0}")]
    StorageError(#[from] crate::storage::StorageError),

    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ConvertError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| ConvertError::WithContextError(format!("{}: {}", message, e)))
    }
}
