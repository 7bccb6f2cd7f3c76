//! Spreadsheet format (`.xlsx`)
//!
//! One row per (passage, annotation) pair under the header
//! `Text | Citation | Metadata | Annotation_Text`. A passage without
//! annotations still gets a row, with the annotation cells blank. Citation
//! spans in the `Text` cell are written as bold rich-text runs; if the rich
//! string is rejected the cell is written as plain text instead. Cells over
//! Excel's character limit are truncated rather than failing the export.
//!
//! Import groups rows by their `Text` value (first-seen order) to rebuild
//! passages. Without a `Text` column every row becomes its own passage.

use super::{Codec, Format};
use crate::config::HighlightConfig;
use crate::corpus::{Annotation, AnnotationField, Corpus};
use crate::error::AnnotateError;
use crate::highlight::{DelimitedText, Highlighter};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use rust_xlsxwriter::{Format as CellFormat, Workbook, Worksheet};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use tracing::{debug, warn};

pub const TEXT_COLUMN: &str = "Text";
pub const SHEET_NAME: &str = "Sheet1";

/// Excel's per-cell character limit
pub const MAX_CELL_CHARS: usize = 32_767;

const HEADERS: [&str; 4] = [TEXT_COLUMN, "Citation", "Metadata", "Annotation_Text"];

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetCodec {
    highlighter: Highlighter,
}

impl SpreadsheetCodec {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            highlighter: Highlighter::new(config),
        }
    }
}

impl Codec for SpreadsheetCodec {
    fn format(&self) -> Format {
        Format::Spreadsheet
    }

    fn export(&self, corpus: &Corpus) -> Result<Vec<u8>, AnnotateError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME).map_err(encode_error)?;

        for (col, header) in HEADERS.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .map_err(encode_error)?;
        }
        worksheet.set_column_width(0, 60).map_err(encode_error)?;
        for col in 1..HEADERS.len() as u16 {
            worksheet.set_column_width(col, 30).map_err(encode_error)?;
        }

        let bold = CellFormat::new().set_bold();
        let plain = CellFormat::new();
        let blank = [Annotation::default()];

        let mut row: u32 = 1;
        for (position, text, annotations) in corpus.iter() {
            let marked = self.highlighter.delimited(text, corpus.citations(position));
            let annotations = if annotations.is_empty() {
                &blank[..]
            } else {
                annotations
            };

            for annotation in annotations {
                write_text_cell(worksheet, row, &marked, &bold, &plain)?;
                for (offset, field) in AnnotationField::ALL.iter().enumerate() {
                    let value = fit_cell(annotation.get(*field), row, field.column());
                    worksheet
                        .write_string(row, offset as u16 + 1, value)
                        .map_err(encode_error)?;
                }
                row += 1;
            }
        }
        debug!("Wrote {} spreadsheet data row(s)", row - 1);

        workbook.save_to_buffer().map_err(encode_error)
    }

    fn import(&self, bytes: &[u8]) -> Result<Corpus, AnnotateError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e: XlsxError| AnnotateError::SpreadsheetDecode(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AnnotateError::SpreadsheetDecode("workbook has no sheets".into()))?
            .map_err(|e| AnnotateError::SpreadsheetDecode(e.to_string()))?;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(Corpus::new());
        };
        let columns = Columns::from_header(header);

        let records: Vec<(String, Annotation)> = rows
            .filter(|row| row.iter().any(|cell| !cell_text(cell).trim().is_empty()))
            .map(|row| (columns.text(row), columns.annotation(row)))
            .collect();

        if columns.text.is_some() {
            Ok(group_by_text(records))
        } else {
            warn!(
                "Spreadsheet has no '{}' column, importing each row as its own passage",
                TEXT_COLUMN
            );
            Ok(one_passage_per_row(records))
        }
    }
}

/// Write the `Text` cell, bolding citation spans when possible
fn write_text_cell(
    worksheet: &mut Worksheet,
    row: u32,
    marked: &DelimitedText,
    bold: &CellFormat,
    plain: &CellFormat,
) -> Result<(), AnnotateError> {
    let text = fit_cell(&marked.plain, row, TEXT_COLUMN);
    if marked.spans.is_empty() || text.len() < marked.plain.len() {
        worksheet.write_string(row, 0, text).map_err(encode_error)?;
        return Ok(());
    }

    let segments: Vec<(&CellFormat, &str)> = marked
        .segments()
        .into_iter()
        .map(|(piece, is_marked)| (if is_marked { bold } else { plain }, piece))
        .collect();
    write_rich_or_plain(worksheet, row, &segments, text)
}

/// Rich string in column 0, or `fallback` as plain text if it is rejected
fn write_rich_or_plain(
    worksheet: &mut Worksheet,
    row: u32,
    segments: &[(&CellFormat, &str)],
    fallback: &str,
) -> Result<(), AnnotateError> {
    if let Err(e) = worksheet.write_rich_string(row, 0, segments) {
        warn!(
            "Rich text rejected for row {}, writing plain text: {}",
            row + 1,
            e
        );
        worksheet
            .write_string(row, 0, fallback)
            .map_err(encode_error)?;
    }
    Ok(())
}

/// Cut `text` to the cell character limit
fn fit_cell<'a>(text: &'a str, row: u32, column: &str) -> &'a str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                "Truncating {} in row {} to {} characters",
                column,
                row + 1,
                MAX_CELL_CHARS
            );
            &text[..cut]
        }
        None => text,
    }
}

/// Header positions, matched case-insensitively
struct Columns {
    text: Option<usize>,
    fields: [Option<usize>; 3],
}

impl Columns {
    fn from_header(header: &[Data]) -> Self {
        let positions: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| (cell_text(cell).trim().to_lowercase(), i))
            .collect();
        let find = |name: &str| positions.get(&name.to_lowercase()).copied();

        Self {
            text: find(TEXT_COLUMN),
            fields: AnnotationField::ALL.map(|field| find(field.column())),
        }
    }

    fn text(&self, row: &[Data]) -> String {
        self.text.map(|i| cell_at(row, i)).unwrap_or_default()
    }

    fn annotation(&self, row: &[Data]) -> Annotation {
        let mut annotation = Annotation::default();
        for (field, column) in AnnotationField::ALL.iter().zip(self.fields.iter()) {
            if let Some(i) = column {
                annotation.set(*field, cell_at(row, *i));
            }
        }
        annotation
    }
}

fn group_by_text(records: Vec<(String, Annotation)>) -> Corpus {
    let mut passages: Vec<String> = Vec::new();
    let mut tables: Vec<Vec<Annotation>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (text, annotation) in records {
        let position = *index.entry(text.clone()).or_insert_with(|| {
            passages.push(text);
            tables.push(Vec::new());
            passages.len() - 1
        });
        tables[position].push(annotation);
    }

    debug!("Grouped spreadsheet rows into {} passage(s)", passages.len());
    let annotations: BTreeMap<usize, Vec<Annotation>> = tables.into_iter().enumerate().collect();
    Corpus::from_parts(passages, annotations)
}

fn one_passage_per_row(records: Vec<(String, Annotation)>) -> Corpus {
    let mut passages = Vec::with_capacity(records.len());
    let mut annotations = BTreeMap::new();
    for (position, (text, annotation)) in records.into_iter().enumerate() {
        passages.push(text);
        annotations.insert(position, vec![annotation]);
    }
    Corpus::from_parts(passages, annotations)
}

fn cell_at(row: &[Data], index: usize) -> String {
    row.get(index).map(cell_text).unwrap_or_default()
}

/// Cell value as text; whole floats drop their `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn encode_error<E: std::fmt::Display>(e: E) -> AnnotateError {
    AnnotateError::Encode(e.to_string())
}
