//! Configuration for rendering and export
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields the stock look: green highlight marks, green document runs,
//! `**` delimiters in spreadsheet text and `annotations.<ext>` filenames.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming a TOML config file
pub const CONFIG_ENV_VAR: &str = "ANNOTATE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateConfig {
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub export: ExportConfig,
    /// Text given to a passage created without explicit text
    #[serde(default = "default_passage_text")]
    pub default_passage_text: String,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            highlight: HighlightConfig::default(),
            export: ExportConfig::default(),
            default_passage_text: default_passage_text(),
        }
    }
}

impl AnnotateConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use annotation_core::config::AnnotateConfig;
    ///
    /// let config = AnnotateConfig::from_str(r##"
    ///     [highlight]
    ///     inline_background = "#ffe082"
    /// "##)?;
    /// assert_eq!(config.highlight.inline_background, "#ffe082");
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `ANNOTATE_CONFIG`, or defaults when unset
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.highlight.delimiter.is_empty() {
            anyhow::bail!("highlight.delimiter must not be empty");
        }
        if !is_hex_rgb(&self.highlight.document_color) {
            anyhow::bail!(
                "highlight.document_color must be six hex digits, got '{}'",
                self.highlight.document_color
            );
        }
        if self.export.file_stem.trim().is_empty() {
            anyhow::bail!("export.file_stem must not be empty");
        }
        Ok(())
    }
}

/// How citation spans are marked in each sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// CSS background of the inline `<mark>` element
    #[serde(default = "default_inline_background")]
    pub inline_background: String,
    /// RGB hex (no `#`) of highlighted runs in the word-processing document
    #[serde(default = "default_document_color")]
    pub document_color: String,
    /// Literal wrapped around spans in delimiter-marked plain text
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Escape `&`, `<`, `>` and `"` in inline HTML output
    #[serde(default = "default_escape_html")]
    pub escape_html: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            inline_background: default_inline_background(),
            document_color: default_document_color(),
            delimiter: default_delimiter(),
            escape_html: default_escape_html(),
        }
    }
}

/// Export output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Filename stem for suggested download names
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
    /// Indent JSON output
    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_stem: default_file_stem(),
            pretty_json: default_pretty_json(),
        }
    }
}

fn default_inline_background() -> String {
    "#b9f6ca".to_string()
}

fn default_document_color() -> String {
    "008000".to_string()
}

fn default_delimiter() -> String {
    "**".to_string()
}

fn default_escape_html() -> bool {
    true
}

fn default_file_stem() -> String {
    "annotations".to_string()
}

fn default_pretty_json() -> bool {
    true
}

fn default_passage_text() -> String {
    crate::corpus::DEFAULT_PASSAGE_TEXT.to_string()
}

fn is_hex_rgb(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = AnnotateConfig::from_str("").unwrap();
        assert_eq!(config, AnnotateConfig::default());
        assert_eq!(config.highlight.delimiter, "**");
        assert_eq!(config.export.file_stem, "annotations");
        assert!(config.export.pretty_json);
        assert_eq!(config.default_passage_text, "Neuer Textabsatz...");
    }

    #[test]
    fn test_partial_override() {
        let config = AnnotateConfig::from_str(
            r#"
            default_passage_text = "Hier Text einfügen"

            [highlight]
            document_color = "1F77B4"

            [export]
            pretty_json = false
            "#,
        )
        .unwrap();

        assert_eq!(config.default_passage_text, "Hier Text einfügen");
        assert_eq!(config.highlight.document_color, "1F77B4");
        assert_eq!(config.highlight.inline_background, "#b9f6ca");
        assert!(!config.export.pretty_json);
        assert_eq!(config.export.file_stem, "annotations");
    }

    #[test]
    fn test_rejects_bad_color() {
        let err = AnnotateConfig::from_str("[highlight]\ndocument_color = \"green\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_empty_delimiter() {
        let err = AnnotateConfig::from_str("[highlight]\ndelimiter = \"\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(AnnotateConfig::from_str("[highlight").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AnnotateConfig::from_file("/nonexistent/annotate.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
