//! Word-processing document format (`.docx`)
//!
//! Export layout, per passage:
//!
//! 1. one paragraph with the passage text, citation spans as colored runs
//! 2. three bulleted paragraphs per annotation: `Citation: …`, `Metadata: …`,
//!    `Annotation: …`
//! 3. an empty separator paragraph
//!
//! Import reads the paragraphs back in two independent passes. The
//! structured pass ([`parse_structured`]) applies when at least one bulleted
//! paragraph carries a field label: plain paragraphs start passages and
//! labelled bullets fill annotation records. Otherwise the footnote pass
//! ([`parse_footnotes`]) looks for `[n]` markers in passage text and uses the
//! paragraph starting with `n ` as that passage's metadata.
//!
//! Documents not written by this module import on a best-effort basis.

use super::{Codec, Format};
use crate::config::HighlightConfig;
use crate::corpus::{Annotation, AnnotationField, Corpus};
use crate::error::AnnotateError;
use crate::highlight::{Highlighter, TextRun};
use lazy_static::lazy_static;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

lazy_static! {
    /// Bracketed footnote marker such as `[3]`
    static ref FOOTNOTE_MARKER: Regex = Regex::new(r"\[(\d+)\]").unwrap();
}

const DOCUMENT_PART: &str = "word/document.xml";
const BULLET_STYLE: &str = "ListBullet";
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:ind w:left="360" w:hanging="360"/></w:pPr></w:style></w:styles>"#;

const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="hybridMultilevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#;

/// A paragraph as seen by the importer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    /// List style or numbering properties present
    pub bulleted: bool,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bulleted: false,
        }
    }

    pub fn bullet(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bulleted: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentCodec {
    highlighter: Highlighter,
}

impl DocumentCodec {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            highlighter: Highlighter::new(config),
        }
    }

    fn document_xml(&self, corpus: &Corpus) -> Result<Vec<u8>, AnnotateError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(encode_error)?;

        let mut root = BytesStart::new("w:document");
        root.push_attribute(("xmlns:w", W_NS));
        writer.write_event(Event::Start(root)).map_err(encode_error)?;
        start(&mut writer, "w:body")?;

        let color = self.highlighter.config().document_color.as_str();
        for (position, text, rows) in corpus.iter() {
            let runs = self.highlighter.runs(text, corpus.citations(position));
            write_passage(&mut writer, &runs, color)?;

            for row in rows {
                for field in AnnotationField::ALL {
                    let line = format!("{}: {}", field.label(), row.get(field));
                    write_bullet(&mut writer, &line)?;
                }
            }

            // separator
            writer
                .write_event(Event::Empty(BytesStart::new("w:p")))
                .map_err(encode_error)?;
        }

        end(&mut writer, "w:body")?;
        end(&mut writer, "w:document")?;
        Ok(writer.into_inner().into_inner())
    }
}

impl Codec for DocumentCodec {
    fn format(&self) -> Format {
        Format::Document
    }

    fn export(&self, corpus: &Corpus) -> Result<Vec<u8>, AnnotateError> {
        let document = self.document_xml(corpus)?;
        package(&document)
    }

    fn import(&self, bytes: &[u8]) -> Result<Corpus, AnnotateError> {
        let paragraphs = read_paragraphs(bytes)?;
        debug!("Read {} paragraph(s) from document", paragraphs.len());

        match parse_structured(&paragraphs) {
            Some(corpus) => Ok(corpus),
            None => {
                warn!("No labelled bullet paragraphs found, falling back to footnote metadata");
                Ok(parse_footnotes(&paragraphs))
            }
        }
    }
}

/// Zip the fixed package parts around a `word/document.xml` body
pub(crate) fn package(document_xml: &[u8]) -> Result<Vec<u8>, AnnotateError> {
    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/numbering.xml", NUMBERING.as_bytes()),
        (DOCUMENT_PART, document_xml),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        zip.start_file(name, file_options())
            .map_err(encode_error)?;
        zip.write_all(body).map_err(encode_error)?;
    }
    let cursor = zip.finish().map_err(encode_error)?;
    Ok(cursor.into_inner())
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Extract every body paragraph of a `.docx`, in document order
pub fn read_paragraphs(bytes: &[u8]) -> Result<Vec<Paragraph>, AnnotateError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| AnnotateError::DocumentDecode(e.to_string()))?;

    let mut xml = String::new();
    {
        let mut part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| AnnotateError::DocumentDecode(format!("{}: {}", DOCUMENT_PART, e)))?;
        part.read_to_string(&mut xml)
            .map_err(|e| AnnotateError::DocumentDecode(e.to_string()))?;
    }

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<Paragraph>, AnnotateError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| AnnotateError::DocumentDecode(format!("{} at byte {}", e, reader.buffer_position())))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(Paragraph::default()),
                b"w:t" => in_text = true,
                b"w:numPr" => mark_bulleted(&mut current),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(Paragraph::default()),
                b"w:pStyle" => {
                    if is_list_style(&e)? {
                        mark_bulleted(&mut current);
                    }
                }
                b"w:numPr" => mark_bulleted(&mut current),
                b"w:tab" => push_text(&mut current, "\t"),
                b"w:br" | b"w:cr" => push_text(&mut current, "\n"),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| AnnotateError::DocumentDecode(e.to_string()))?;
                push_text(&mut current, &text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn mark_bulleted(current: &mut Option<Paragraph>) {
    if let Some(paragraph) = current {
        paragraph.bulleted = true;
    }
}

fn push_text(current: &mut Option<Paragraph>, text: &str) {
    if let Some(paragraph) = current {
        paragraph.text.push_str(text);
    }
}

fn is_list_style(e: &BytesStart<'_>) -> Result<bool, AnnotateError> {
    let value = e
        .try_get_attribute("w:val")
        .map_err(|e| AnnotateError::DocumentDecode(e.to_string()))?;
    match value {
        Some(attr) => {
            let style = attr
                .unescape_value()
                .map_err(|e| AnnotateError::DocumentDecode(e.to_string()))?;
            Ok(style.starts_with("List"))
        }
        None => Ok(false),
    }
}

/// Split `Label: value` into its field and trimmed value
fn split_label(text: &str) -> Option<(AnnotationField, &str)> {
    AnnotationField::ALL.iter().find_map(|field| {
        [field.label(), field.column()].iter().find_map(|label| {
            text.strip_prefix(label)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(|value| (*field, value.trim()))
        })
    })
}

/// Recover passages and annotations from labelled bullet paragraphs.
///
/// Returns `None` when no bulleted paragraph carries a field label, which
/// means the document does not have this layout at all.
pub fn parse_structured(paragraphs: &[Paragraph]) -> Option<Corpus> {
    let has_structure = paragraphs
        .iter()
        .any(|p| p.bulleted && split_label(p.text.trim()).is_some());
    if !has_structure {
        return None;
    }

    let mut passages: Vec<String> = Vec::new();
    let mut tables: Vec<Vec<Annotation>> = Vec::new();

    for paragraph in paragraphs {
        let text = paragraph.text.trim();
        if text.is_empty() {
            continue;
        }

        if !paragraph.bulleted {
            passages.push(text.to_string());
            tables.push(Vec::new());
            continue;
        }

        let Some(rows) = tables.last_mut() else {
            debug!("Ignoring bullet before the first passage: {}", text);
            continue;
        };
        let Some((field, value)) = split_label(text) else {
            debug!("Ignoring unlabelled bullet: {}", text);
            continue;
        };

        if field == AnnotationField::Citation || rows.is_empty() {
            rows.push(Annotation::default());
        }
        if let Some(record) = rows.last_mut() {
            record.set(field, value);
        }
    }

    debug!(
        "Structured document import: {} passage(s), {} annotation(s)",
        passages.len(),
        tables.iter().map(Vec::len).sum::<usize>()
    );

    let annotations: BTreeMap<usize, Vec<Annotation>> = tables.into_iter().enumerate().collect();
    Some(Corpus::from_parts(passages, annotations))
}

/// Footnote heuristic for documents without labelled bullets.
///
/// Every non-empty plain paragraph is a passage unless it is the body of a
/// footnote referenced by some `[n]` marker. A footnote body for a marker in
/// paragraph `i` is the last paragraph after `i` that starts with `n `, so
/// a passage opening with a number before its reference stays a passage.
/// Each passage gets one record whose metadata is the body of its first
/// resolvable footnote ("" if none).
pub fn parse_footnotes(paragraphs: &[Paragraph]) -> Corpus {
    let texts: Vec<&str> = paragraphs
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect();

    let find_note = |number: &str, marker_at: usize| -> Option<usize> {
        let prefix = format!("{} ", number);
        texts
            .iter()
            .enumerate()
            .skip(marker_at + 1)
            .filter(|(_, t)| t.starts_with(&prefix))
            .map(|(i, _)| i)
            .last()
    };

    let mut note_bodies = HashSet::new();
    for (at, text) in texts.iter().enumerate() {
        for marker in FOOTNOTE_MARKER.captures_iter(text) {
            if let Some(index) = find_note(&marker[1], at) {
                note_bodies.insert(index);
            }
        }
    }

    let mut passages = Vec::new();
    let mut annotations = BTreeMap::new();
    let mut index = 0;
    for paragraph in paragraphs {
        let text = paragraph.text.trim();
        if text.is_empty() {
            continue;
        }
        let this = index;
        index += 1;
        if paragraph.bulleted || note_bodies.contains(&this) {
            continue;
        }

        let metadata = FOOTNOTE_MARKER
            .captures_iter(text)
            .find_map(|marker| find_note(&marker[1], this))
            .map(|note| texts[note].to_string())
            .unwrap_or_default();

        annotations.insert(passages.len(), vec![Annotation::new("", metadata, "")]);
        passages.push(text.to_string());
    }

    debug!(
        "Footnote document import: {} passage(s), {} footnote(s)",
        passages.len(),
        note_bodies.len()
    );

    Corpus::from_parts(passages, annotations)
}

fn write_passage<W: Write>(
    writer: &mut Writer<W>,
    runs: &[TextRun],
    color: &str,
) -> Result<(), AnnotateError> {
    start(writer, "w:p")?;
    for run in runs {
        let run_color = if run.highlighted { Some(color) } else { None };
        write_run(writer, &run.text, run_color)?;
    }
    end(writer, "w:p")
}

fn write_bullet<W: Write>(writer: &mut Writer<W>, text: &str) -> Result<(), AnnotateError> {
    start(writer, "w:p")?;
    start(writer, "w:pPr")?;
    empty_with_val(writer, "w:pStyle", BULLET_STYLE)?;
    start(writer, "w:numPr")?;
    empty_with_val(writer, "w:ilvl", "0")?;
    empty_with_val(writer, "w:numId", "1")?;
    end(writer, "w:numPr")?;
    end(writer, "w:pPr")?;
    write_run(writer, text, None)?;
    end(writer, "w:p")
}

/// One run; newlines become `<w:br/>` and tabs `<w:tab/>`
fn write_run<W: Write>(
    writer: &mut Writer<W>,
    text: &str,
    color: Option<&str>,
) -> Result<(), AnnotateError> {
    start(writer, "w:r")?;
    if let Some(color) = color {
        start(writer, "w:rPr")?;
        empty_with_val(writer, "w:color", color)?;
        end(writer, "w:rPr")?;
    }

    let text = xml_safe(text);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            writer
                .write_event(Event::Empty(BytesStart::new("w:br")))
                .map_err(encode_error)?;
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                writer
                    .write_event(Event::Empty(BytesStart::new("w:tab")))
                    .map_err(encode_error)?;
            }
            if piece.is_empty() {
                continue;
            }
            let mut t = BytesStart::new("w:t");
            t.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(t)).map_err(encode_error)?;
            writer
                .write_event(Event::Text(BytesText::new(piece)))
                .map_err(encode_error)?;
            end(writer, "w:t")?;
        }
    }

    end(writer, "w:r")
}

/// Drop characters XML 1.0 cannot carry, such as most C0 controls
fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return Cow::Borrowed(text);
    }
    debug!("Dropping control characters not allowed in XML");
    Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect())
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), AnnotateError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(encode_error)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), AnnotateError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_error)
}

fn empty_with_val<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), AnnotateError> {
    let mut element = BytesStart::new(name);
    element.push_attribute(("w:val", value));
    writer
        .write_event(Event::Empty(element))
        .map_err(encode_error)
}

fn encode_error<E: std::fmt::Display>(e: E) -> AnnotateError {
    AnnotateError::Encode(e.to_string())
}
