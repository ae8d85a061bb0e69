use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::OutputTable;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::SpreadsheetWriter;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::borrow::Cow;
use std::fs::File;
use std::io::BufWriter;
use std::io::Cursor;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

// Package part names
const PART_CONTENT_TYPES: &str = "[Content_Types].xml";
const PART_ROOT_RELATIONSHIPS: &str = "_rels/.rels";
const PART_CORE_PROPERTIES: &str = "docProps/core.xml";
const PART_WORKBOOK: &str = "xl/workbook.xml";
const PART_WORKBOOK_RELATIONSHIPS: &str = "xl/_rels/workbook.xml.rels";
const PART_WORKSHEET: &str = "xl/worksheets/sheet1.xml";
const PART_STYLES: &str = "xl/styles.xml";

const NS_SPREADSHEET: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Longest sheet name accepted by spreadsheet applications
const MAX_SHEET_NAME: usize = 31;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELATIONSHIPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const WORKBOOK_RELATIONSHIPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Drops characters that XML 1.0 cannot carry, such as vertical tabs pasted from word processors
fn xml_safe(value: &str) -> Cow<'_, str> {
    let allowed = |c: char| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}');
    if value.chars().all(allowed) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(value.chars().filter(|c| allowed(*c)).collect())
    }
}

/// Replaces characters spreadsheet applications reject in sheet names and cuts the name to length
fn sanitize_sheet_name(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let name = name.trim_matches('\'').trim();
    if name.is_empty() { "Sheet1".to_owned() } else { name.to_owned() }
}

/// Writes an [`OutputTable`] as a single-sheet Office Open XML workbook (`.xlsx`).
///
/// The header row comes first, every value is stored as an inline string and
/// empty values produce no cell.
#[derive(Clone, Debug)]
pub struct XlsxWriter {
    sheet_name: String,
}

impl Default for XlsxWriter {
    fn default() -> Self {
        XlsxWriter { sheet_name: "Sheet1".to_owned() }
    }
}

impl XlsxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet_name(name: &str) -> Self {
        XlsxWriter { sheet_name: sanitize_sheet_name(name) }
    }

    /// Writes the workbook package into any seekable writer
    pub fn write_to<W: Write + Seek>(&self, writer: W, table: &OutputTable) -> Result<W, SpreadsheetError> {
        table.validate()?;
        let parts: [(&str, Cow<[u8]>); 7] = [
            (PART_CONTENT_TYPES, Cow::Borrowed(CONTENT_TYPES_XML.as_bytes())),
            (PART_ROOT_RELATIONSHIPS, Cow::Borrowed(ROOT_RELATIONSHIPS_XML.as_bytes())),
            (PART_CORE_PROPERTIES, Cow::Owned(core_properties_xml(Utc::now())?)),
            (PART_WORKBOOK, Cow::Owned(workbook_xml(&self.sheet_name)?)),
            (PART_WORKBOOK_RELATIONSHIPS, Cow::Borrowed(WORKBOOK_RELATIONSHIPS_XML.as_bytes())),
            (PART_STYLES, Cow::Borrowed(STYLES_XML.as_bytes())),
            (PART_WORKSHEET, Cow::Owned(worksheet_xml(table)?)),
        ];

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(writer);
        for (name, content) in parts.iter() {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        Ok(zip.finish()?)
    }
}

impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, path: &Path, table: &OutputTable) -> Result<(), SpreadsheetError> {
        let file = File::create(path)?;
        let mut writer = self.write_to(BufWriter::new(file), table)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), rows = table.rows.len(), columns = table.headers.len(), "spreadsheet written");
        Ok(())
    }
}

fn xml_writer() -> Result<Writer<Cursor<Vec<u8>>>, SpreadsheetError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(writer)
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = xml_writer()?;
    let workbook = BytesStart::new("workbook").with_attributes([("xmlns", NS_SPREADSHEET), ("xmlns:r", NS_RELATIONSHIPS)]);
    writer.write_event(Event::Start(workbook))?;
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    let sheet = BytesStart::new("sheet").with_attributes([("name", sheet_name), ("sheetId", "1"), ("r:id", "rId1")]);
    writer.write_event(Event::Empty(sheet))?;
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner().into_inner())
}

fn core_properties_xml(created: DateTime<Utc>) -> Result<Vec<u8>, SpreadsheetError> {
    let timestamp = created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut writer = xml_writer()?;
    let properties = BytesStart::new("cp:coreProperties").with_attributes([
        ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
        ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
        ("xmlns:dcterms", "http://purl.org/dc/terms/"),
        ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ]);
    writer.write_event(Event::Start(properties))?;
    writer.write_event(Event::Start(BytesStart::new("dc:creator")))?;
    writer.write_event(Event::Text(BytesText::new(env!("CARGO_PKG_NAME"))))?;
    writer.write_event(Event::End(BytesEnd::new("dc:creator")))?;
    for name in ["dcterms:created", "dcterms:modified"] {
        writer.write_event(Event::Start(BytesStart::new(name).with_attributes([("xsi:type", "dcterms:W3CDTF")])))?;
        writer.write_event(Event::Text(BytesText::new(&timestamp)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    writer.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_row<'a, I>(writer: &mut Writer<Cursor<Vec<u8>>>, row: usize, values: I) -> Result<(), SpreadsheetError>
where
    I: Iterator<Item = &'a str>,
{
    let number = (row + 1).to_string();
    writer.write_event(Event::Start(BytesStart::new("row").with_attributes([("r", number.as_str())])))?;
    for (column, value) in values.enumerate() {
        if value.is_empty() {
            continue;
        }
        let reference = index_to_reference(row, column);
        let cell = BytesStart::new("c").with_attributes([("r", reference.as_str()), ("t", "inlineStr")]);
        writer.write_event(Event::Start(cell))?;
        writer.write_event(Event::Start(BytesStart::new("is")))?;
        writer.write_event(Event::Start(BytesStart::new("t").with_attributes([("xml:space", "preserve")])))?;
        writer.write_event(Event::Text(BytesText::new(&xml_safe(value))))?;
        writer.write_event(Event::End(BytesEnd::new("t")))?;
        writer.write_event(Event::End(BytesEnd::new("is")))?;
        writer.write_event(Event::End(BytesEnd::new("c")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn worksheet_xml(table: &OutputTable) -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = xml_writer()?;
    writer.write_event(Event::Start(BytesStart::new("worksheet").with_attributes([("xmlns", NS_SPREADSHEET)])))?;
    if !table.headers.is_empty() {
        let last_row = table.rows.len();
        let last_column = table.headers.len() - 1;
        let dimension = format!("A1:{}", index_to_reference(last_row, last_column));
        writer.write_event(Event::Empty(BytesStart::new("dimension").with_attributes([("ref", dimension.as_str())])))?;
    }
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    write_row(&mut writer, 0, table.headers.iter().map(String::as_str))?;
    for (index, row) in table.rows.iter().enumerate() {
        write_row(&mut writer, index + 1, row.values())?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner().into_inner())
}
