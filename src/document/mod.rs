//! # Document Loading Module
//!
//! Opens a WordprocessingML (`.docx`) package and exposes its body tables,
//! together with the relationship lookup needed to follow hyperlinks and
//! embedded pictures referenced from table cells.
use crate::error::ConvertError;
use crate::error::ResultMessage;
use crate::helpers::zip::ZipHelper;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

pub(crate) mod package;
pub(crate) mod parser;

use package::ContentTypes;

/// Main document part inside the package
pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
/// Relationships of the main document part
pub(crate) const DOCUMENT_RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";
/// Package-wide content type declarations
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Error types specific to document loading
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A part required to read the document is absent from the package
    #[error("Missing part '{0}' in document package")]
    MissingPartError(String),

    /// A relationship points at a package part that does not exist
    #[error("Relationship '{0}' targets missing part '{1}'")]
    BrokenRelationshipError(String, String),
}

/// A relationship from the main document part to another part or an external target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// Target as written in the relationships part
    pub target: String,
    /// Whether the target lives outside the package (`TargetMode="External"`)
    pub external: bool,
}

impl Relationship {
    /// Returns the package path of an internal target, resolved against the `word/` folder
    pub fn part_path(&self) -> Option<String> {
        (!self.external).then(|| package::to_part_path("word", &self.target))
    }
}

/// A table cell as read from the document body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Text of the cell's own paragraphs, one entry per paragraph
    pub(crate) paragraphs: Vec<String>,
    /// Relationship ids of `w:hyperlink` elements, in document order
    pub(crate) hyperlink_ids: Vec<String>,
    /// Field instructions (`w:instrText` / `w:fldSimple`), in document order
    pub(crate) field_instructions: Vec<String>,
    /// Relationship ids of pictures (`a:blip`, `v:imagedata`), in document order
    pub(crate) image_ids: Vec<String>,
}

impl Cell {
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    pub(crate) cells: Vec<Cell>,
}

impl Row {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub(crate) rows: Vec<Row>,
    /// Number of grid columns declared by the table
    pub(crate) column_count: usize,
}

impl Table {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }
}

/// An opened `.docx` package
pub struct Document {
    /// File name of the document
    pub name: String,
    /// ZIP container, kept open so that media parts can be read on demand
    zip: RefCell<ZipArchive<BufReader<File>>>,
    /// Relationships of the main document part keyed by id
    relationships: HashMap<String, Relationship>,
    /// Content types of package parts
    content_types: ContentTypes,
    /// Top-level body tables in document order
    tables: Vec<Table>,
}

impl Document {
    /// Opens a `.docx` file and parses its body tables
    ///
    /// # Arguments
    /// * `path` - Path to the document
    ///
    /// # Returns
    /// The loaded document, or an error when the file is missing or cannot be parsed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Document, ConvertError> {
        let name = path.as_ref().display().to_string();
        Self::load(path.as_ref()).with_prefix(&format!("Cannot open document '{}'", name))
    }

    fn load(path: &Path) -> Result<Document, ConvertError> {
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        let content_types = package::load_content_types(&mut zip)?;
        let relationships = package::load_relationships(&mut zip, DOCUMENT_RELATIONSHIPS_PART)?;
        let mut reader = zip.xml_reader(DOCUMENT_PART)?
            .ok_or_else(|| DocumentError::MissingPartError(DOCUMENT_PART.to_owned()))?;
        let tables = parser::load_tables(&mut reader)?;
        drop(reader);

        tracing::debug!(
            path = %path.display(),
            tables = tables.len(),
            relationships = relationships.len(),
            "loaded document"
        );
        Ok(Document {
            name: path.display().to_string(),
            zip: RefCell::new(zip),
            relationships,
            content_types,
            tables,
        })
    }

    /// Returns the top-level body tables in document order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Looks up a relationship of the main document part by id
    pub fn resolve(&self, id: &str) -> Option<&Relationship> {
        self.relationships.get(id)
    }

    /// Returns the declared content type of a package part
    pub fn content_type(&self, part: &str) -> Option<&str> {
        self.content_types.content_type(part)
    }

    /// Reads the bytes of a package part
    pub fn read_part(&self, part: &str) -> Result<Option<Vec<u8>>, ConvertError> {
        self.zip.borrow_mut().read_bytes(part)
    }
}
