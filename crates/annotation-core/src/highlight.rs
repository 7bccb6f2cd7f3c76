//! Citation highlighting for the three output sinks
//!
//! Span selection lives in [`crate::matcher::select_spans`]; this module only
//! turns the chosen spans into sink-specific markup:
//!
//! - `Inline`: HTML with a `<mark>` element per span, for on-screen display
//! - `Runs`: plain/highlighted runs, one document paragraph's worth
//! - `Delimited`: plain text with each span wrapped in a delimiter, plus the
//!   spans themselves for later bold formatting in a spreadsheet cell

use crate::config::HighlightConfig;
use crate::matcher::{select_spans, Span};
use serde::{Deserialize, Serialize};

/// Which sink to render for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    Inline,
    Runs,
    Delimited,
}

/// One run of a rich-text paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub highlighted: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: false,
        }
    }

    pub fn highlighted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: true,
        }
    }
}

/// Plain text with delimiter-wrapped spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedText {
    /// Text with every span wrapped in the delimiter
    pub text: String,
    /// The unmarked source text
    pub plain: String,
    /// Marked spans as byte ranges of `plain`
    pub spans: Vec<Span>,
}

impl DelimitedText {
    /// Split `plain` into (text, is_marked) pieces
    pub fn segments(&self) -> Vec<(&str, bool)> {
        segments(&self.plain, &self.spans)
    }
}

/// Sink-specific output of [`Highlighter::highlight`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum MarkedText {
    Inline { html: String },
    Runs { runs: Vec<TextRun> },
    Delimited(DelimitedText),
}

impl MarkedText {
    pub fn style(&self) -> HighlightStyle {
        match self {
            MarkedText::Inline { .. } => HighlightStyle::Inline,
            MarkedText::Runs { .. } => HighlightStyle::Runs,
            MarkedText::Delimited(_) => HighlightStyle::Delimited,
        }
    }
}

/// Renders highlighted passages according to a [`HighlightConfig`]
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    config: HighlightConfig,
}

impl Highlighter {
    pub fn new(config: HighlightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Highlight `citations` in `text` for the chosen sink.
    ///
    /// Never fails; citations that do not occur are skipped.
    pub fn highlight<'a, I>(&self, text: &str, citations: I, style: HighlightStyle) -> MarkedText
    where
        I: IntoIterator<Item = &'a str>,
    {
        let spans = select_spans(text, citations);
        match style {
            HighlightStyle::Inline => MarkedText::Inline {
                html: self.render_inline(text, &spans),
            },
            HighlightStyle::Runs => MarkedText::Runs {
                runs: render_runs(text, &spans),
            },
            HighlightStyle::Delimited => MarkedText::Delimited(self.render_delimited(text, spans)),
        }
    }

    /// HTML for on-screen display
    pub fn inline<'a, I>(&self, text: &str, citations: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.render_inline(text, &select_spans(text, citations))
    }

    /// Runs for a document paragraph
    pub fn runs<'a, I>(&self, text: &str, citations: I) -> Vec<TextRun>
    where
        I: IntoIterator<Item = &'a str>,
    {
        render_runs(text, &select_spans(text, citations))
    }

    /// Delimiter-marked text for a spreadsheet cell
    pub fn delimited<'a, I>(&self, text: &str, citations: I) -> DelimitedText
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.render_delimited(text, select_spans(text, citations))
    }

    fn render_inline(&self, text: &str, spans: &[Span]) -> String {
        let mut html = String::with_capacity(text.len());
        for (piece, marked) in segments(text, spans) {
            let piece = if self.config.escape_html {
                escape_html(piece)
            } else {
                piece.to_string()
            };
            if marked {
                html.push_str(&format!(
                    "<mark style=\"background-color: {}; padding: 2px 4px; border-radius: 3px;\">{}</mark>",
                    self.config.inline_background, piece
                ));
            } else {
                html.push_str(&piece);
            }
        }
        html
    }

    fn render_delimited(&self, text: &str, spans: Vec<Span>) -> DelimitedText {
        let delimiter = &self.config.delimiter;
        let mut marked = String::with_capacity(text.len() + spans.len() * 2 * delimiter.len());
        for (piece, is_marked) in segments(text, &spans) {
            if is_marked {
                marked.push_str(delimiter);
                marked.push_str(piece);
                marked.push_str(delimiter);
            } else {
                marked.push_str(piece);
            }
        }
        DelimitedText {
            text: marked,
            plain: text.to_string(),
            spans,
        }
    }
}

/// Highlight with the default configuration
pub fn highlight<'a, I>(text: &str, citations: I, style: HighlightStyle) -> MarkedText
where
    I: IntoIterator<Item = &'a str>,
{
    Highlighter::default().highlight(text, citations, style)
}

fn render_runs(text: &str, spans: &[Span]) -> Vec<TextRun> {
    segments(text, spans)
        .into_iter()
        .map(|(piece, marked)| TextRun {
            text: piece.to_string(),
            highlighted: marked,
        })
        .collect()
}

/// Split `text` at sorted, disjoint `spans`. Empty pieces are omitted.
pub fn segments<'t>(text: &'t str, spans: &[Span]) -> Vec<(&'t str, bool)> {
    let mut out = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        if span.start > cursor {
            out.push((&text[cursor..span.start], false));
        }
        if !span.is_empty() {
            out.push((&text[span.as_range()], true));
        }
        cursor = span.end;
    }
    if cursor < text.len() {
        out.push((&text[cursor..], false));
    }

    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
