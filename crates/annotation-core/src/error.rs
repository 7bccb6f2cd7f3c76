use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to decode JSON corpus: {0}")]
    JsonDecode(String),

    #[error("Failed to decode document: {0}")]
    DocumentDecode(String),

    #[error("Failed to decode spreadsheet: {0}")]
    SpreadsheetDecode(String),

    #[error("Export failed: {0}")]
    Encode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl AnnotateError {
    /// True for failures caused by unreadable input bytes.
    ///
    /// The corpus a caller holds must stay untouched when this is true.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            AnnotateError::JsonDecode(_)
                | AnnotateError::DocumentDecode(_)
                | AnnotateError::SpreadsheetDecode(_)
        )
    }
}
