//! Corpus persistence formats
//!
//! Three independent codecs: JSON (lossless), a word-processing document and
//! a spreadsheet (both human-readable and heuristic on the way back in).
//! Import never touches an existing corpus; [`Corpus::replace_from`] swaps
//! the new corpus in only after decoding succeeded.

pub mod document;
pub mod json;
pub mod spreadsheet;

use crate::config::AnnotateConfig;
use crate::corpus::Corpus;
use crate::error::AnnotateError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub use document::DocumentCodec;
pub use json::JsonCodec;
pub use spreadsheet::SpreadsheetCodec;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Json,
    Document,
    Spreadsheet,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Json, Format::Document, Format::Spreadsheet];

    /// Pick a format from a file extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Result<Self, AnnotateError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "docx" => Ok(Format::Document),
            "xlsx" => Ok(Format::Spreadsheet),
            other => Err(AnnotateError::UnsupportedFormat(format!(
                "unknown extension '{}'",
                other
            ))),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnnotateError> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            AnnotateError::UnsupportedFormat(format!("no extension on {}", path.display()))
        })?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Document => "docx",
            Format::Spreadsheet => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn suggested_filename(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::Json => "JSON",
            Format::Document => "document",
            Format::Spreadsheet => "spreadsheet",
        };
        f.write_str(name)
    }
}

/// A serializer/deserializer for one format
pub trait Codec {
    fn format(&self) -> Format;

    fn export(&self, corpus: &Corpus) -> Result<Vec<u8>, AnnotateError>;

    fn import(&self, bytes: &[u8]) -> Result<Corpus, AnnotateError>;
}

/// Codec for `format` configured from `config`
pub fn codec_for(format: Format, config: &AnnotateConfig) -> Box<dyn Codec> {
    match format {
        Format::Json => Box::new(JsonCodec::new(config.export.pretty_json)),
        Format::Document => Box::new(DocumentCodec::new(config.highlight.clone())),
        Format::Spreadsheet => Box::new(SpreadsheetCodec::new(config.highlight.clone())),
    }
}

/// Exported bytes plus what a download needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

/// Serialize `corpus` in `format`
pub fn export(
    format: Format,
    corpus: &Corpus,
    config: &AnnotateConfig,
) -> Result<Exported, AnnotateError> {
    let bytes = codec_for(format, config).export(corpus)?;
    info!(
        "Exported {} passage(s) as {} ({} bytes)",
        corpus.len(),
        format,
        bytes.len()
    );
    Ok(Exported {
        bytes,
        filename: format.suggested_filename(&config.export.file_stem),
        content_type: format.content_type(),
    })
}

/// Deserialize a corpus from `bytes` in `format`
pub fn import(format: Format, bytes: &[u8]) -> Result<Corpus, AnnotateError> {
    let corpus = codec_for(format, &AnnotateConfig::default()).import(bytes)?;
    info!(
        "Imported {} passage(s), {} annotation(s) from {}",
        corpus.len(),
        corpus.stats().annotations,
        format
    );
    Ok(corpus)
}

impl Corpus {
    /// Replace this corpus with one decoded from `bytes`.
    ///
    /// On error `self` is left exactly as it was.
    pub fn replace_from(&mut self, format: Format, bytes: &[u8]) -> Result<(), AnnotateError> {
        let imported = import(format, bytes)?;
        *self = imported;
        Ok(())
    }
}
