//! Corpus model: passages and their annotation tables
//!
//! Passages and annotation sequences are stored as two vectors of equal
//! length, so every passage position always has exactly one (possibly
//! empty) annotation sequence and no sequence can exist for a position
//! outside the passage bounds. Removing a passage removes both entries at
//! once, which shifts every later sequence down together with its passage.
//!
//! Bounds violations are no-ops. The mutating operations report whether
//! anything changed, but callers are free to ignore that.

use crate::config::AnnotateConfig;
use crate::matcher::occurs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Text given to passages added without explicit text
pub const DEFAULT_PASSAGE_TEXT: &str = "Neuer Textabsatz...";

/// One annotation attached to a passage
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "Citation", default)]
    pub citation: String,
    #[serde(rename = "Metadata", default)]
    pub metadata: String,
    #[serde(rename = "Annotation_Text", default)]
    pub annotation_text: String,
}

impl Annotation {
    pub fn new(
        citation: impl Into<String>,
        metadata: impl Into<String>,
        annotation_text: impl Into<String>,
    ) -> Self {
        Self {
            citation: citation.into(),
            metadata: metadata.into(),
            annotation_text: annotation_text.into(),
        }
    }

    /// True when all three fields are empty or whitespace
    pub fn is_blank(&self) -> bool {
        AnnotationField::ALL
            .iter()
            .all(|field| self.get(*field).trim().is_empty())
    }

    pub fn get(&self, field: AnnotationField) -> &str {
        match field {
            AnnotationField::Citation => &self.citation,
            AnnotationField::Metadata => &self.metadata,
            AnnotationField::AnnotationText => &self.annotation_text,
        }
    }

    pub fn set(&mut self, field: AnnotationField, value: impl Into<String>) {
        let value = value.into();
        match field {
            AnnotationField::Citation => self.citation = value,
            AnnotationField::Metadata => self.metadata = value,
            AnnotationField::AnnotationText => self.annotation_text = value,
        }
    }

    /// Whether the citation occurs in `passage`, ignoring case
    pub fn found_in(&self, passage: &str) -> bool {
        occurs(&self.citation, passage)
    }
}

/// The three persisted annotation fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationField {
    Citation,
    Metadata,
    AnnotationText,
}

impl AnnotationField {
    pub const ALL: [AnnotationField; 3] = [
        AnnotationField::Citation,
        AnnotationField::Metadata,
        AnnotationField::AnnotationText,
    ];

    /// Column / JSON key name
    pub fn column(&self) -> &'static str {
        match self {
            AnnotationField::Citation => "Citation",
            AnnotationField::Metadata => "Metadata",
            AnnotationField::AnnotationText => "Annotation_Text",
        }
    }

    /// Label used on bulleted document lines
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationField::Citation => "Citation",
            AnnotationField::Metadata => "Metadata",
            AnnotationField::AnnotationText => "Annotation",
        }
    }
}

/// Display projection of an annotation with the derived "found in text" flag.
///
/// Never persisted. Converting back into [`Annotation`] drops the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationView {
    pub found_in_text: bool,
    pub citation: String,
    pub metadata: String,
    pub annotation_text: String,
}

impl AnnotationView {
    pub fn new(annotation: &Annotation, passage: &str) -> Self {
        Self {
            found_in_text: annotation.found_in(passage),
            citation: annotation.citation.clone(),
            metadata: annotation.metadata.clone(),
            annotation_text: annotation.annotation_text.clone(),
        }
    }
}

impl From<AnnotationView> for Annotation {
    fn from(view: AnnotationView) -> Self {
        Annotation {
            citation: view.citation,
            metadata: view.metadata,
            annotation_text: view.annotation_text,
        }
    }
}

/// Aggregate counts shown below the passage list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub passages: usize,
    pub annotations: usize,
    pub words: usize,
    pub citations_found: usize,
}

/// Passages plus one annotation sequence per passage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    passages: Vec<String>,
    annotations: Vec<Vec<Annotation>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seed corpus a fresh session starts from
    pub fn sample() -> Self {
        let passages = vec![
            "Dies ist der erste Beispielabsatz. Er enthält grundlegende Informationen.".to_string(),
            "Dieser zweite Absatz bietet ergänzende Details und Kontext zum Thema.".to_string(),
        ];
        let annotations = vec![
            vec![
                Annotation::new(
                    "Beispielabsatz",
                    "Author: Mustermann, Year: 2023, Page: 45",
                    "Diese Passage führt in das Thema ein und stellt die Grundlagen dar.",
                ),
                Annotation::new(
                    "grundlegende Informationen",
                    "Author: Schmidt, Year: 2022, Chapter: 3",
                    "Der Begriff \"grundlegende Informationen\" bezieht sich auf Basisdaten.",
                ),
            ],
            vec![Annotation::new(
                "ergänzende Details",
                "Author: Weber, Year: 2024, Volume: 2, Page: 78",
                "Dieser Absatz erweitert die Grundlagen um wichtige Kontextinformationen.",
            )],
        ];
        Self {
            passages,
            annotations,
        }
    }

    /// Passages with empty annotation sequences
    pub fn from_passages<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let passages: Vec<String> = passages.into_iter().map(Into::into).collect();
        let annotations = vec![Vec::new(); passages.len()];
        Self {
            passages,
            annotations,
        }
    }

    /// Build from passages and a position-keyed annotation map.
    ///
    /// Positions without an entry get an empty sequence. Entries for
    /// positions outside the passage bounds are dropped.
    pub fn from_parts(passages: Vec<String>, mut annotations: BTreeMap<usize, Vec<Annotation>>) -> Self {
        let mut corpus = Self::from_passages(passages);

        let stray: Vec<usize> = annotations
            .keys()
            .copied()
            .filter(|&position| position >= corpus.passages.len())
            .collect();
        if !stray.is_empty() {
            warn!(
                "Dropping annotations for {} position(s) beyond {} passage(s): {:?}",
                stray.len(),
                corpus.passages.len(),
                stray
            );
        }

        for (position, rows) in corpus.annotations.iter_mut().enumerate() {
            if let Some(found) = annotations.remove(&position) {
                *rows = found;
            }
        }

        corpus
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    pub fn passage(&self, position: usize) -> Option<&str> {
        self.passages.get(position).map(String::as_str)
    }

    /// Annotations of a passage; empty for out-of-range positions
    pub fn annotations(&self, position: usize) -> &[Annotation] {
        self.annotations
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// (position, passage text, annotations) in passage order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &[Annotation])> + '_ {
        self.passages
            .iter()
            .zip(self.annotations.iter())
            .enumerate()
            .map(|(position, (text, rows))| (position, text.as_str(), rows.as_slice()))
    }

    /// Non-blank citations of a passage, in insertion order
    pub fn citations(&self, position: usize) -> Vec<&str> {
        self.annotations(position)
            .iter()
            .map(|a| a.citation.as_str())
            .filter(|c| !c.trim().is_empty())
            .collect()
    }

    /// Annotations of a passage with their "found in text" flag computed now
    pub fn annotation_views(&self, position: usize) -> Vec<AnnotationView> {
        let Some(text) = self.passage(position) else {
            return Vec::new();
        };
        self.annotations(position)
            .iter()
            .map(|a| AnnotationView::new(a, text))
            .collect()
    }

    /// How many annotations of a passage have their citation in the text
    pub fn found_count(&self, position: usize) -> usize {
        let Some(text) = self.passage(position) else {
            return 0;
        };
        self.annotations(position)
            .iter()
            .filter(|a| a.found_in(text))
            .count()
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            passages: self.passages.len(),
            annotations: self.annotations.iter().map(Vec::len).sum(),
            words: self
                .passages
                .iter()
                .map(|p| p.split_whitespace().count())
                .sum(),
            citations_found: (0..self.passages.len()).map(|i| self.found_count(i)).sum(),
        }
    }

    /// Append a passage with the default text
    pub fn add_passage(&mut self) -> usize {
        self.add_passage_with_text(DEFAULT_PASSAGE_TEXT)
    }

    /// Append a passage with the configured default text
    pub fn add_configured_passage(&mut self, config: &AnnotateConfig) -> usize {
        self.add_passage_with_text(config.default_passage_text.as_str())
    }

    /// Append a passage seeded with one blank annotation row; returns its position
    pub fn add_passage_with_text(&mut self, text: impl Into<String>) -> usize {
        self.passages.push(text.into());
        self.annotations.push(vec![Annotation::default()]);
        let position = self.passages.len() - 1;
        debug!("Added passage {}", position);
        position
    }

    /// Remove a passage together with its annotations.
    ///
    /// Does nothing when the position is out of range or when it is the
    /// last remaining passage.
    pub fn remove_passage(&mut self, position: usize) -> bool {
        if self.passages.len() <= 1 || position >= self.passages.len() {
            return false;
        }
        self.passages.remove(position);
        self.annotations.remove(position);
        debug!(
            "Removed passage {}, {} remaining",
            position,
            self.passages.len()
        );
        true
    }

    /// Replace a passage's text; annotations are kept as they are
    pub fn edit_passage_text(&mut self, position: usize, text: impl Into<String>) -> bool {
        match self.passages.get_mut(position) {
            Some(slot) => {
                *slot = text.into();
                true
            }
            None => false,
        }
    }

    /// Append an empty annotation; returns its row index
    pub fn add_annotation(&mut self, position: usize) -> Option<usize> {
        let rows = self.annotations.get_mut(position)?;
        rows.push(Annotation::default());
        Some(rows.len() - 1)
    }

    pub fn remove_annotation(&mut self, position: usize, row: usize) -> bool {
        match self.annotations.get_mut(position) {
            Some(rows) if row < rows.len() => {
                rows.remove(row);
                true
            }
            _ => false,
        }
    }

    /// Replace a passage's whole annotation sequence.
    ///
    /// Accepts anything convertible into [`Annotation`], so edited
    /// [`AnnotationView`] rows can be passed straight back; their derived
    /// flag is dropped in the conversion.
    pub fn replace_annotations<I, R>(&mut self, position: usize, rows: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: Into<Annotation>,
    {
        match self.annotations.get_mut(position) {
            Some(slot) => {
                *slot = rows.into_iter().map(Into::into).collect();
                true
            }
            None => false,
        }
    }

    pub fn update_annotation(&mut self, position: usize, row: usize, annotation: Annotation) -> bool {
        match self.annotation_mut(position, row) {
            Some(slot) => {
                *slot = annotation;
                true
            }
            None => false,
        }
    }

    /// Edit a single cell of a passage's annotation table
    pub fn set_annotation_field(
        &mut self,
        position: usize,
        row: usize,
        field: AnnotationField,
        value: impl Into<String>,
    ) -> bool {
        match self.annotation_mut(position, row) {
            Some(slot) => {
                slot.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Discard everything and start over from [`Corpus::sample`]
    pub fn reset_to_sample(&mut self) {
        *self = Self::sample();
    }

    fn annotation_mut(&mut self, position: usize, row: usize) -> Option<&mut Annotation> {
        self.annotations.get_mut(position)?.get_mut(row)
    }
}
