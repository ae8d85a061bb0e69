//! Cell content extraction: text, external hyperlinks and embedded pictures.
//!
//! Extraction never fails from the caller's point of view. A cell whose
//! markup or relationships cannot be followed simply has no hyperlink or no
//! picture, and resolution moves on to the next strategy.
use crate::document::Cell;
use crate::document::Document;
use crate::document::DocumentError;
use crate::error::ConvertError;
use regex::Regex;
use std::sync::LazyLock;

/// Field code hyperlink, e.g. `HYPERLINK "https://example.com/a.jpg" \o "tip"`
static FIELD_HYPERLINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"HYPERLINK\s+"([^"]+)""#).expect("Hardcode regex pattern"));

/// Raw image bytes with their media type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    /// Media type such as `image/png`, unknown when the source did not declare one
    pub media_type: Option<String>,
}

/// Read access to the resolvable content of a table cell.
///
/// Keeps the resolution engine independent from the concrete document backend.
pub trait CellContent {
    /// Trimmed, newline-joined text of the cell's paragraphs
    fn text(&self) -> String;

    /// External hyperlink targets: structural hyperlinks first, then field-code hyperlinks
    fn external_hyperlinks(&self) -> Result<Vec<String>, ConvertError>;

    /// Embedded pictures in the order the cell references them
    fn embedded_images(&self) -> Result<Vec<ImageBlob>, ConvertError>;

    /// First embedded picture. Overrides may stop reading once it is found.
    fn first_image(&self) -> Result<Option<ImageBlob>, ConvertError> {
        Ok(self.embedded_images()?.into_iter().next())
    }
}

/// Normalizes a cell's paragraphs into a single trimmed string
pub fn cell_text<C: CellContent + ?Sized>(cell: &C) -> String {
    cell.text()
}

/// Returns the first external hyperlink of a cell, or `None` when there is none
/// or the cell's links cannot be resolved
pub fn first_hyperlink_url<C: CellContent + ?Sized>(cell: &C) -> Option<String> {
    match cell.external_hyperlinks() {
        Ok(links) => links.into_iter().next(),
        Err(error) => {
            tracing::debug!(%error, "hyperlink extraction failed, treating cell as link-free");
            None
        }
    }
}

/// Returns the first embedded picture of a cell, or `None` when there is none
/// or the picture cannot be read
pub fn first_embedded_image<C: CellContent + ?Sized>(cell: &C) -> Option<ImageBlob> {
    match cell.first_image() {
        Ok(image) => image,
        Err(error) => {
            tracing::debug!(%error, "image extraction failed, treating cell as image-free");
            None
        }
    }
}

/// Joins paragraph texts the way the cell is displayed: each paragraph trimmed,
/// newline separated, and the result trimmed again
pub(crate) fn join_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> String {
    paragraphs
        .iter()
        .map(|paragraph| paragraph.as_ref().trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Extracts the quoted target of a `HYPERLINK` field instruction
pub(crate) fn field_hyperlink(instruction: &str) -> Option<&str> {
    if !instruction.contains("HYPERLINK") {
        return None;
    }
    FIELD_HYPERLINK
        .captures(instruction)
        .and_then(|captures| captures.get(1))
        .map(|target| target.as_str())
}

/// A parsed `.docx` cell together with the document whose relationships it references
pub struct DocxCell<'a> {
    pub cell: &'a Cell,
    pub document: &'a Document,
}

impl<'a> DocxCell<'a> {
    pub fn new(cell: &'a Cell, document: &'a Document) -> Self {
        DocxCell { cell, document }
    }

    fn read_image(&self, id: &str) -> Result<Option<ImageBlob>, ConvertError> {
        let Some(relationship) = self.document.resolve(id) else {
            return Ok(None);
        };
        let Some(part) = relationship.part_path() else {
            return Ok(None);
        };
        let media_type = match self.document.content_type(&part) {
            Some(kind) if kind.starts_with("image/") => kind.to_owned(),
            _ => return Ok(None),
        };
        let bytes = self.document.read_part(&part)?
            .ok_or_else(|| DocumentError::BrokenRelationshipError(id.to_owned(), part.to_owned()))?;
        Ok(Some(ImageBlob { bytes, media_type: Some(media_type) }))
    }
}

impl CellContent for DocxCell<'_> {
    fn text(&self) -> String {
        join_paragraphs(&self.cell.paragraphs)
    }

    fn external_hyperlinks(&self) -> Result<Vec<String>, ConvertError> {
        let structural = self.cell.hyperlink_ids
            .iter()
            .filter_map(|id| self.document.resolve(id))
            .filter(|relationship| relationship.external)
            .map(|relationship| relationship.target.to_owned());
        let field_codes = self.cell.field_instructions
            .iter()
            .filter_map(|instruction| field_hyperlink(instruction))
            .map(str::to_owned);
        Ok(structural.chain(field_codes).collect())
    }

    fn embedded_images(&self) -> Result<Vec<ImageBlob>, ConvertError> {
        let mut images = Vec::new();
        for id in &self.cell.image_ids {
            if let Some(image) = self.read_image(id)? {
                images.push(image);
            }
        }
        Ok(images)
    }

    fn first_image(&self) -> Result<Option<ImageBlob>, ConvertError> {
        for id in &self.cell.image_ids {
            if let Some(image) = self.read_image(id)? {
                return Ok(Some(image));
            }
        }
        Ok(None)
    }
}
