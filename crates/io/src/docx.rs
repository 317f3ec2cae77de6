// Curriculum document import (.docx)

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use gradcheck_recon::{RawTable, ReconError, SourceDocument};

const DOCUMENT_PART: &str = "word/document.xml";

/// Read the top-level paragraphs and tables of a .docx file.
pub fn import(path: &Path) -> Result<SourceDocument, ReconError> {
    let file = File::open(path)
        .map_err(|e| ReconError::Document(format!("{}: {e}", path.display())))?;
    import_from_reader(file)
}

pub fn import_from_reader<R: Read + Seek>(reader: R) -> Result<SourceDocument, ReconError> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| ReconError::Document(format!("not a .docx archive: {e}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ReconError::Document(format!("{DOCUMENT_PART}: {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ReconError::Document(format!("{DOCUMENT_PART}: {e}")))?;
    parse_document_xml(&xml)
}

// ---------------------------------------------------------------------------
// document.xml
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CellBuilder {
    paragraphs: Vec<String>,
    span: usize,
    /// `Some(false)` starts a vertical merge, `Some(true)` continues one.
    v_merge: Option<bool>,
}

/// Paragraph being collected, with the stack depth of its `w:p`.
struct OpenParagraph {
    depth: usize,
    text: String,
    /// Paragraphs nested inside this one (text boxes) are not collected.
    nested: usize,
}

#[derive(Default)]
struct DocumentParser {
    stack: Vec<Vec<u8>>,
    paragraphs: Vec<String>,
    /// Paragraphs before this index belong to an earlier table's caption window.
    caption_floor: usize,
    tables: Vec<RawTable>,
    table_depth: usize,
    table_rows: Vec<Vec<String>>,
    row: Option<Vec<CellBuilder>>,
    cell: Option<CellBuilder>,
    paragraph: Option<OpenParagraph>,
}

pub fn parse_document_xml(xml: &str) -> Result<SourceDocument, ReconError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut parser = DocumentParser::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => parser.start(e),
            Ok(Event::Empty(ref e)) => {
                parser.start(e);
                parser.end(e.local_name().as_ref());
            }
            Ok(Event::End(ref e)) => parser.end(e.local_name().as_ref()),
            Ok(Event::Text(ref e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).to_string();
                parser.text(&text);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).to_string();
                parser.text(&text);
            }
            Ok(Event::GeneralRef(ref e)) => {
                let name = String::from_utf8_lossy(e.as_ref()).to_string();
                if let Some(text) = resolve_entity(&name) {
                    parser.text(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ReconError::Document(format!(
                    "{DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(
        paragraphs = parser.paragraphs.len(),
        tables = parser.tables.len(),
        "docx parsed"
    );

    Ok(SourceDocument {
        paragraphs: parser.paragraphs,
        tables: parser.tables,
    })
}

impl DocumentParser {
    fn parent(&self) -> Option<&[u8]> {
        self.stack.last().map(|n| n.as_slice())
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name().as_ref().to_vec();
        let parent = self.parent().map(|p| p.to_vec());
        let parent = parent.as_deref();

        match name.as_slice() {
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 && parent == Some(b"body".as_slice()) {
                    self.table_rows.clear();
                }
            }
            b"tr" if self.table_depth == 1 => self.row = Some(Vec::new()),
            b"tc" if self.table_depth == 1 => {
                self.cell = Some(CellBuilder {
                    span: 1,
                    ..CellBuilder::default()
                })
            }
            b"gridSpan" if self.table_depth == 1 => {
                if let (Some(cell), Some(val)) = (self.cell.as_mut(), attr_val(e)) {
                    cell.span = val.parse::<usize>().unwrap_or(1).max(1);
                }
            }
            b"vMerge" if self.table_depth == 1 => {
                if let Some(cell) = self.cell.as_mut() {
                    cell.v_merge = Some(attr_val(e).as_deref() != Some("restart"));
                }
            }
            b"p" => match self.paragraph.as_mut() {
                Some(open) => open.nested += 1,
                None => {
                    let top_level = self.table_depth == 0 && parent == Some(b"body".as_slice());
                    let in_cell = self.table_depth == 1 && parent == Some(b"tc".as_slice());
                    if top_level || in_cell {
                        self.paragraph = Some(OpenParagraph {
                            depth: self.stack.len(),
                            text: String::new(),
                            nested: 0,
                        });
                    }
                }
            },
            b"tab" if parent == Some(b"r".as_slice()) => self.push_text("\t"),
            b"br" | b"cr" if parent == Some(b"r".as_slice()) => {
                let page_break = matches!(attr_type(e).as_deref(), Some("page") | Some("column"));
                if !page_break {
                    self.push_text("\n");
                }
            }
            _ => {}
        }

        self.stack.push(name);
    }

    fn end(&mut self, name: &[u8]) {
        self.stack.pop();

        match name {
            b"p" => {
                let closes_open = self
                    .paragraph
                    .as_ref()
                    .is_some_and(|open| open.depth == self.stack.len());
                if closes_open {
                    if let Some(open) = self.paragraph.take() {
                        self.finish_paragraph(open.text);
                    }
                } else if let Some(open) = self.paragraph.as_mut() {
                    open.nested = open.nested.saturating_sub(1);
                }
            }
            b"tc" if self.table_depth == 1 => {
                if let (Some(row), Some(cell)) = (self.row.as_mut(), self.cell.take()) {
                    row.push(cell);
                }
            }
            b"tr" if self.table_depth == 1 => {
                if let Some(cells) = self.row.take() {
                    let resolved = resolve_row(cells, self.table_rows.last());
                    self.table_rows.push(resolved);
                }
            }
            b"tbl" => {
                if self.table_depth == 1 {
                    let rows = std::mem::take(&mut self.table_rows);
                    let top_level = self.parent() == Some(b"body".as_slice());
                    if top_level {
                        let mut table = RawTable::new(rows);
                        let window = &self.paragraphs[self.caption_floor..];
                        if let Some(caption) = window.iter().rev().find(|p| !p.trim().is_empty()) {
                            table = table.with_caption(caption.trim());
                        }
                        self.tables.push(table);
                        self.caption_floor = self.paragraphs.len();
                    }
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.parent() == Some(b"t".as_slice()) {
            self.push_text(text);
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(open) = self.paragraph.as_mut() {
            if open.nested == 0 {
                open.text.push_str(text);
            }
        }
    }

    fn finish_paragraph(&mut self, text: String) {
        if self.table_depth == 0 {
            self.paragraphs.push(text);
        } else if let Some(cell) = self.cell.as_mut() {
            cell.paragraphs.push(text);
        }
    }
}

/// One string per grid column: spans repeat their text, vertical-merge
/// continuations take the text of the cell above.
fn resolve_row(cells: Vec<CellBuilder>, above: Option<&Vec<String>>) -> Vec<String> {
    let mut out = Vec::new();
    for cell in cells {
        let col = out.len();
        let text = if cell.v_merge == Some(true) {
            above.and_then(|row| row.get(col)).cloned().unwrap_or_default()
        } else {
            cell.paragraphs.join("\n")
        };
        for _ in 0..cell.span {
            out.push(text.clone());
        }
    }
    out
}

fn attr_val(e: &BytesStart<'_>) -> Option<String> {
    attr_local(e, b"val")
}

fn attr_type(e: &BytesStart<'_>) -> Option<String> {
    attr_local(e, b"type")
}

fn attr_local(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn resolve_entity(name: &str) -> Option<String> {
    let text = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            return char::from_u32(code).map(String::from);
        }
    };
    Some(text.to_string())
}
