//! Streaming parser for the tables of `word/document.xml`
use crate::document::Cell;
use crate::document::Row;
use crate::document::Table;
use crate::error::ConvertError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::match_xml_events;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::BufRead;

// XML tag names for parsing WordprocessingML tables
const TAG_BODY: QName = QName(b"w:body");               // Document body
const TAG_TABLE: QName = QName(b"w:tbl");               // Table
const TAG_GRID_COLUMN: QName = QName(b"w:gridCol");     // Column of the table grid
const TAG_ROW: QName = QName(b"w:tr");                  // Table row
const TAG_CELL: QName = QName(b"w:tc");                 // Table cell
const TAG_GRID_SPAN: QName = QName(b"w:gridSpan");      // Number of grid columns spanned by a cell
const TAG_PARAGRAPH: QName = QName(b"w:p");             // Paragraph
const TAG_RUN: QName = QName(b"w:r");                   // Run of text
const TAG_TEXT: QName = QName(b"w:t");                  // Text content within a run
const TAG_TAB: QName = QName(b"w:tab");                 // Tab character within a run
const TAG_BREAK: QName = QName(b"w:br");                // Line break within a run
const TAG_CARRIAGE_RETURN: QName = QName(b"w:cr");      // Carriage return within a run
const TAG_TEXT_BOX: QName = QName(b"w:txbxContent");    // Text box content (not cell text)
const TAG_HYPERLINK: QName = QName(b"w:hyperlink");     // Structural hyperlink
const TAG_INSTRUCTION: QName = QName(b"w:instrText");   // Complex field instruction
const TAG_SIMPLE_FIELD: QName = QName(b"w:fldSimple");  // Simple field with inline instruction
const TAG_BLIP: QName = QName(b"a:blip");               // DrawingML picture fill
const TAG_IMAGE_DATA: QName = QName(b"v:imagedata");    // VML picture

/// Widest span accepted when the table declares no grid; Word tables stop at 63 columns
const MAX_GRID_SPAN: usize = 63;

/// Cell being assembled, with the number of grid columns it spans
struct CellBuilder {
    cell: Cell,
    span: usize,
}

/// Top-level table being assembled
#[derive(Default)]
struct TableBuilder {
    table: Table,
    row: Option<Row>,
    cell: Option<CellBuilder>,
    /// Depth of tables nested inside the current cell
    nested: usize,
    /// Depth of text boxes inside the current paragraph
    text_boxes: usize,
    /// Text of the cell paragraph being read
    paragraph: Option<String>,
    /// Field instruction being read
    instruction: Option<String>,
    in_text: bool,
}

impl TableBuilder {
    /// Whether text events currently belong to a paragraph of the cell
    fn collecting_text(&self) -> bool {
        self.in_text && self.text_boxes == 0 && self.paragraph.is_some()
    }

    /// Buffer receiving the text of the current event, if any
    fn text_target(&mut self) -> Option<&mut String> {
        if self.instruction.is_some() {
            self.instruction.as_mut()
        } else if self.collecting_text() {
            self.paragraph.as_mut()
        } else {
            None
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.text_boxes == 0 {
            if let Some(paragraph) = self.paragraph.as_mut() {
                paragraph.push_str(text);
            }
        }
    }

    fn start(&mut self, event: &BytesStart, parent: Option<QName>) -> Result<(), ConvertError> {
        let name = event.name();
        if name == TAG_TABLE {
            self.nested += 1;
            return Ok(());
        }
        if self.nested == 0 {
            if name == TAG_GRID_COLUMN {
                self.table.column_count += 1;
            } else if name == TAG_ROW {
                self.row = Some(Row::default());
            } else if name == TAG_CELL {
                self.cell = Some(CellBuilder { cell: Cell::default(), span: 1 });
            } else if name == TAG_GRID_SPAN {
                let span = event.parse_attribute_value::<usize>("w:val")?.unwrap_or(1);
                let limit = match self.table.column_count {
                    0 => MAX_GRID_SPAN,
                    columns => columns,
                };
                if let Some(cell) = self.cell.as_mut() {
                    cell.span = span.clamp(1, limit);
                }
            } else if name == TAG_PARAGRAPH && parent == Some(TAG_CELL) {
                self.paragraph = Some(String::new());
            }
        }

        if name == TAG_TEXT_BOX {
            self.text_boxes += 1;
        } else if name == TAG_TEXT {
            self.in_text = true;
        } else if parent == Some(TAG_RUN) && name == TAG_TAB {
            self.push_text("\t");
        } else if parent == Some(TAG_RUN) && (name == TAG_BREAK || name == TAG_CARRIAGE_RETURN) {
            self.push_text("\n");
        }

        let Some(cell) = self.cell.as_mut() else {
            return Ok(());
        };
        if name == TAG_HYPERLINK {
            if let Some(id) = event.get_attribute_value("r:id")? {
                cell.cell.hyperlink_ids.push(id.into_owned());
            }
        } else if name == TAG_SIMPLE_FIELD {
            if let Some(instruction) = event.get_attribute_value("w:instr")? {
                cell.cell.field_instructions.push(instruction.into_owned());
            }
        } else if name == TAG_BLIP {
            if let Some(id) = event.get_attribute_value("r:embed")? {
                cell.cell.image_ids.push(id.into_owned());
            }
        } else if name == TAG_IMAGE_DATA {
            if let Some(id) = event.get_attribute_value("r:id")? {
                cell.cell.image_ids.push(id.into_owned());
            }
        } else if name == TAG_INSTRUCTION {
            self.instruction = Some(String::new());
        }
        Ok(())
    }

    /// Handles a closing tag. Returns true when the table itself is closed.
    fn end(&mut self, name: QName, parent: Option<QName>) -> bool {
        if name == TAG_TABLE {
            if self.nested == 0 {
                return true;
            }
            self.nested -= 1;
        } else if name == TAG_INSTRUCTION {
            if let Some((instruction, cell)) = self.instruction.take().zip(self.cell.as_mut()) {
                cell.cell.field_instructions.push(instruction);
            }
        } else if name == TAG_TEXT {
            self.in_text = false;
        } else if name == TAG_TEXT_BOX {
            self.text_boxes = self.text_boxes.saturating_sub(1);
        } else if self.nested > 0 {
            // nested table content never closes rows or cells of the outer table
        } else if name == TAG_PARAGRAPH && parent == Some(TAG_CELL) {
            if let Some((text, cell)) = self.paragraph.take().zip(self.cell.as_mut()) {
                cell.cell.paragraphs.push(text);
            }
        } else if name == TAG_CELL {
            if let Some((cell, row)) = self.cell.take().zip(self.row.as_mut()) {
                for _ in 1..cell.span {
                    row.cells.push(cell.cell.clone());
                }
                row.cells.push(cell.cell);
            }
        } else if name == TAG_ROW {
            if let Some(row) = self.row.take() {
                self.table.rows.push(row);
            }
        }
        false
    }

    fn finish(mut self) -> Table {
        if self.table.column_count == 0 {
            self.table.column_count = self.table.rows
                .iter()
                .map(|row| row.cells.len())
                .max()
                .unwrap_or(0);
        }
        self.table
    }
}

/// Reads every top-level body table of a WordprocessingML document part
///
/// Only tables that are direct children of `w:body` are returned. Content of
/// tables nested in a cell contributes hyperlinks and pictures to that cell but
/// not text, matching how a cell's own paragraphs are defined.
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of `word/document.xml`
///
/// # Returns
/// Tables in document order
pub(crate) fn load_tables<R: BufRead>(reader: &mut XmlReader<R>) -> Result<Vec<Table>, ConvertError> {
    let mut tables = Vec::<Table>::new();
    let mut stack = Vec::<Vec<u8>>::new();
    let mut current: Option<TableBuilder> = None;

    match_xml_events!(reader => {
        Event::Start(event) => {
            let parent = stack.last().map(|parent| QName(parent.as_slice()));
            if let Some(builder) = current.as_mut() {
                builder.start(&event, parent)?;
            } else if event.name() == TAG_TABLE && parent == Some(TAG_BODY) {
                current = Some(TableBuilder::default());
            }
            stack.push(event.name().as_ref().to_vec());
        }
        Event::Text(event) => {
            if let Some(text) = current.as_mut().and_then(TableBuilder::text_target) {
                text.push_bytes_text(&event)?;
            }
        }
        Event::GeneralRef(event) => {
            if let Some(text) = current.as_mut().and_then(TableBuilder::text_target) {
                text.push_bytes_ref(&event)?;
            }
        }
        Event::End(event) => {
            stack.pop();
            let parent = stack.last().map(|parent| QName(parent.as_slice()));
            let closed = current.as_mut()
                .map(|builder| builder.end(event.name(), parent))
                .unwrap_or(false);
            if closed {
                if let Some(builder) = current.take() {
                    tables.push(builder.finish());
                }
            }
        }
    });
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::wrap_body;

    fn parse(body: &str) -> Vec<Table> {
        let xml = wrap_body(body);
        let mut reader = XmlReader::new(xml.as_bytes());
        load_tables(&mut reader).unwrap()
    }

    fn texts(row: &Row) -> Vec<Vec<String>> {
        row.cells.iter().map(|cell| cell.paragraphs.clone()).collect()
    }

    #[test]
    fn reads_cells_and_grid() {
        let tables = parse(r#"
            <w:p><w:r><w:t>Intro</w:t></w:r></w:p>
            <w:tbl>
              <w:tblGrid><w:gridCol w:w="100"/><w:gridCol w:w="100"/></w:tblGrid>
              <w:tr>
                <w:tc><w:p><w:r><w:t xml:space="preserve"> Name </w:t></w:r></w:p></w:tc>
                <w:tc><w:p><w:r><w:t>Fish &amp; </w:t></w:r><w:r><w:t>Chips</w:t></w:r></w:p><w:p/></w:tc>
              </w:tr>
            </w:tbl>"#);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column_count, 2);
        assert_eq!(texts(&tables[0].rows[0]), vec![
            vec![" Name ".to_owned()],
            vec!["Fish & Chips".to_owned(), "".to_owned()],
        ]);
    }

    #[test]
    fn tabs_and_breaks_inside_runs() {
        let tables = parse(r#"
            <w:tbl><w:tr><w:tc>
              <w:p>
                <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
                <w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r>
              </w:p>
            </w:tc></w:tr></w:tbl>"#);

        assert_eq!(tables[0].rows[0].cells[0].paragraphs, vec!["a\tb\nc".to_owned()]);
    }

    #[test]
    fn grid_span_repeats_cell() {
        let tables = parse(r#"
            <w:tbl><w:tr>
              <w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>wide</w:t></w:r></w:p></w:tc>
              <w:tc><w:p><w:r><w:t>narrow</w:t></w:r></w:p></w:tc>
            </w:tr></w:tbl>"#);

        let row = &tables[0].rows[0];
        assert_eq!(row.cells.len(), 3);
        assert_eq!(row.cells[0], row.cells[1]);
        assert_eq!(row.cells[2].paragraphs, vec!["narrow".to_owned()]);
        // No grid declared: widest row decides
        assert_eq!(tables[0].column_count, 3);
    }

    #[test]
    fn grid_span_is_clamped() {
        let tables = parse(r#"
            <w:tbl><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid><w:tr>
              <w:tc><w:tcPr><w:gridSpan w:val="1000000000"/></w:tcPr><w:p><w:r><w:t>huge</w:t></w:r></w:p></w:tc>
            </w:tr></w:tbl>
            <w:tbl><w:tr>
              <w:tc><w:tcPr><w:gridSpan w:val="1000000000"/></w:tcPr><w:p/></w:tc>
            </w:tr></w:tbl>"#);

        assert_eq!(tables[0].rows[0].cells.len(), 2);
        assert_eq!(tables[0].rows[0].cells[1].paragraphs, vec!["huge".to_owned()]);
        assert_eq!(tables[1].rows[0].cells.len(), MAX_GRID_SPAN);
    }

    #[test]
    fn nested_tables_are_not_top_level() {
        let tables = parse(r#"
            <w:tbl><w:tr>
              <w:tc>
                <w:p><w:r><w:t>outer</w:t></w:r></w:p>
                <w:tbl><w:tr><w:tc>
                  <w:p><w:hyperlink r:id="rId3"><w:r><w:t>inner</w:t></w:r></w:hyperlink></w:p>
                </w:tc></w:tr></w:tbl>
              </w:tc>
              <w:tc><w:p/></w:tc>
            </w:tr></w:tbl>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>second</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#);

        assert_eq!(tables.len(), 2);
        let cells = &tables[0].rows[0].cells;
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].paragraphs, vec!["outer".to_owned()]);
        assert_eq!(cells[0].hyperlink_ids, vec!["rId3".to_owned()]);
        assert_eq!(texts(&tables[1].rows[0]), vec![vec!["second".to_owned()]]);
    }

    #[test]
    fn collects_links_fields_and_pictures() {
        let tables = parse(r#"
            <w:tbl><w:tr><w:tc>
              <w:p>
                <w:hyperlink r:id="rId4"><w:r><w:t>site</w:t></w:r></w:hyperlink>
                <w:r><w:fldChar w:fldCharType="begin"/></w:r>
                <w:r><w:instrText xml:space="preserve"> HYPERLINK "https://example.com/x.png" </w:instrText></w:r>
                <w:r><w:fldChar w:fldCharType="separate"/></w:r>
                <w:r><w:t>x</w:t></w:r>
                <w:r><w:fldChar w:fldCharType="end"/></w:r>
                <w:fldSimple w:instr="HYPERLINK &quot;https://example.com/y.png&quot;"><w:r><w:t>y</w:t></w:r></w:fldSimple>
                <w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic>
                  <pic:blipFill><a:blip r:embed="rId8"/></pic:blipFill>
                </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>
                <w:r><w:pict><v:shape><v:imagedata r:id="rId9"/></v:shape></w:pict></w:r>
              </w:p>
            </w:tc></w:tr></w:tbl>"#);

        let cell = &tables[0].rows[0].cells[0];
        assert_eq!(cell.paragraphs, vec!["sitexy".to_owned()]);
        assert_eq!(cell.hyperlink_ids, vec!["rId4".to_owned()]);
        assert_eq!(cell.field_instructions, vec![
            r#" HYPERLINK "https://example.com/x.png" "#.to_owned(),
            r#"HYPERLINK "https://example.com/y.png""#.to_owned(),
        ]);
        assert_eq!(cell.image_ids, vec!["rId8".to_owned(), "rId9".to_owned()]);
    }

    #[test]
    fn text_boxes_are_not_cell_text() {
        let tables = parse(r#"
            <w:tbl><w:tr><w:tc>
              <w:p>
                <w:r><w:t>visible</w:t></w:r>
                <w:r><w:pict><v:shape><v:textbox><w:txbxContent>
                  <w:p><w:r><w:t>hidden</w:t></w:r></w:p>
                </w:txbxContent></v:textbox></v:shape></w:pict></w:r>
              </w:p>
            </w:tc></w:tr></w:tbl>"#);

        assert_eq!(tables[0].rows[0].cells[0].paragraphs, vec!["visible".to_owned()]);
    }
}
