//! Fixtures shared by unit tests: in-memory ZIP archives and minimal `.docx` packages
use std::io::Cursor;
use std::io::Write;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::ZipArchive;
use zip::ZipWriter;

const HYPERLINK_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const IMAGE_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Builds a ZIP archive in memory from `(name, bytes)` entries
pub(crate) fn zip_archive(entries: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(zip_bytes(entries))).unwrap()
}

pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Wraps body content into a complete `word/document.xml`
pub(crate) fn wrap_body(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:v="urn:schemas-microsoft-com:vml">
<w:body>{body}<w:sectPr/></w:body>
</w:document>"#
    )
}

/// Cell containing one paragraph of plain text
pub(crate) fn text_cell(text: &str) -> String {
    if text.is_empty() {
        return "<w:tc><w:p/></w:tc>".to_owned();
    }
    format!(r#"<w:tc><w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p></w:tc>"#)
}

/// Cell containing an inline picture referencing relationship `id`
pub(crate) fn image_cell(id: &str) -> String {
    format!(
        r#"<w:tc><w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{id}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p></w:tc>"#
    )
}

/// Cell containing a structural hyperlink referencing relationship `id`
pub(crate) fn hyperlink_cell(id: &str, text: &str) -> String {
    format!(r#"<w:tc><w:p><w:hyperlink r:id="{id}"><w:r><w:t>{text}</w:t></w:r></w:hyperlink></w:p></w:tc>"#)
}

/// Table markup from rows of cell markup
pub(crate) fn table_xml(columns: usize, rows: &[Vec<String>]) -> String {
    let grid: String = (0..columns).map(|_| r#"<w:gridCol w:w="1000"/>"#).collect();
    let rows: String = rows
        .iter()
        .map(|cells| format!("<w:tr>{}</w:tr>", cells.concat()))
        .collect();
    format!("<w:tbl><w:tblPr/><w:tblGrid>{grid}</w:tblGrid>{rows}</w:tbl>")
}

/// Builder of minimal `.docx` packages
#[derive(Default)]
pub(crate) struct DocxBuilder {
    body: String,
    relationships: Vec<String>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a table of plain text cells
    pub(crate) fn table(self, rows: &[&[&str]]) -> Self {
        let columns = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|text| text_cell(text)).collect())
            .collect();
        self.body(&table_xml(columns, &rows))
    }

    /// Appends raw body markup
    pub(crate) fn body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub(crate) fn hyperlink_relationship(mut self, id: &str, url: &str) -> Self {
        self.relationships.push(format!(
            r#"<Relationship Id="{id}" Type="{HYPERLINK_TYPE}" Target="{url}" TargetMode="External"/>"#
        ));
        self
    }

    /// Adds a media part under `word/` and an image relationship pointing at it
    pub(crate) fn image(mut self, id: &str, target: &str, bytes: &[u8]) -> Self {
        self.relationships.push(format!(
            r#"<Relationship Id="{id}" Type="{IMAGE_TYPE}" Target="{target}"/>"#
        ));
        self.media.push((format!("word/{target}"), bytes.to_vec()));
        self
    }

    /// Adds an image relationship without the media part it points at
    pub(crate) fn dangling_image(mut self, id: &str, target: &str) -> Self {
        self.relationships.push(format!(
            r#"<Relationship Id="{id}" Type="{IMAGE_TYPE}" Target="{target}"/>"#
        ));
        self
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Default Extension="jpeg" ContentType="image/jpeg"/>
<Default Extension="gif" ContentType="image/gif"/>
<Default Extension="bin" ContentType="application/octet-stream"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;
        let relationships = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            self.relationships.concat()
        );
        let document = wrap_body(&self.body);
        let mut entries: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", content_types.as_bytes()),
            ("word/document.xml", document.as_bytes()),
            ("word/_rels/document.xml.rels", relationships.as_bytes()),
        ];
        for (name, bytes) in &self.media {
            entries.push((name.as_str(), bytes.as_slice()));
        }
        zip_bytes(&entries)
    }

    /// Writes the package to a temporary `.docx` file
    pub(crate) fn write(&self) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        file.write_all(&self.bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
