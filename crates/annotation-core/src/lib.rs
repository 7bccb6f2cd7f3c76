//! Annotation Core - passages, citation annotations and their file formats
//!
//! This crate provides:
//! - The in-memory corpus of text passages with per-passage annotation tables
//! - Case-insensitive citation matching and literal span selection
//! - Highlight rendering for HTML, rich-text runs and delimited cells
//! - JSON, `.docx` and `.xlsx` import/export
//! - TOML configuration
//!
//! # Example
//!
//! ```no_run
//! use annotation_core::{export, AnnotateConfig, Corpus, Format};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut corpus = Corpus::sample();
//! let position = corpus.add_passage_with_text("Der Fuchs springt über den Zaun.");
//! corpus.set_annotation_field(position, 0, annotation_core::AnnotationField::Citation, "Fuchs");
//!
//! let exported = export(Format::Document, &corpus, &AnnotateConfig::default())?;
//! std::fs::write(&exported.filename, &exported.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod formats;
pub mod highlight;
pub mod matcher;

// Re-export commonly used types
pub use config::{AnnotateConfig, ExportConfig, HighlightConfig};
pub use corpus::{Annotation, AnnotationField, AnnotationView, Corpus, CorpusStats};
pub use error::AnnotateError;
pub use formats::{codec_for, export, import, Codec, Exported, Format};
pub use highlight::{HighlightStyle, Highlighter, MarkedText, TextRun};
pub use matcher::{occurs, select_spans, Span};
