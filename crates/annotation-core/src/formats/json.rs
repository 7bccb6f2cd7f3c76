//! JSON format: the canonical, lossless one
//!
//! ```json
//! {
//!   "text_passages": ["..."],
//!   "annotations": {
//!     "0": [{"Citation": "...", "Metadata": "...", "Annotation_Text": "..."}]
//!   }
//! }
//! ```
//!
//! Import is lenient about shape: missing sections default to empty, unknown
//! record fields are ignored, scalar values are rendered to text and keys
//! that are not passage positions are skipped. Only unparseable input or a
//! wrongly typed section is an error.

use super::{Codec, Format};
use crate::corpus::{Annotation, AnnotationField, Corpus};
use crate::error::AnnotateError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const PASSAGES_KEY: &str = "text_passages";
pub const ANNOTATIONS_KEY: &str = "annotations";

#[derive(Serialize)]
struct JsonCorpus<'a> {
    text_passages: &'a [String],
    // usize keys serialize as strings, in numeric order
    annotations: BTreeMap<usize, &'a [Annotation]>,
}

#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    pretty: bool,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonCodec {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Export as a `serde_json::Value`, for callers that embed the corpus
    pub fn to_value(corpus: &Corpus) -> Result<Value, AnnotateError> {
        serde_json::to_value(Self::document(corpus))
            .map_err(|e| AnnotateError::Encode(e.to_string()))
    }

    fn document(corpus: &Corpus) -> JsonCorpus<'_> {
        JsonCorpus {
            text_passages: corpus.passages(),
            annotations: corpus
                .iter()
                .map(|(position, _, rows)| (position, rows))
                .collect(),
        }
    }
}

impl Codec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn export(&self, corpus: &Corpus) -> Result<Vec<u8>, AnnotateError> {
        let document = Self::document(corpus);
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&document)
        } else {
            serde_json::to_vec(&document)
        };
        bytes.map_err(|e| AnnotateError::Encode(e.to_string()))
    }

    fn import(&self, bytes: &[u8]) -> Result<Corpus, AnnotateError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| AnnotateError::JsonDecode(e.to_string()))?;

        let root = value
            .as_object()
            .ok_or_else(|| AnnotateError::JsonDecode("top level must be an object".into()))?;

        let passages = parse_passages(root)?;
        let annotations = parse_annotations(root)?;
        debug!(
            "Parsed {} passage(s) and {} annotation table(s) from JSON",
            passages.len(),
            annotations.len()
        );

        Ok(Corpus::from_parts(passages, annotations))
    }
}

fn parse_passages(root: &Map<String, Value>) -> Result<Vec<String>, AnnotateError> {
    match root.get(PASSAGES_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().map(value_to_text).collect()),
        Some(_) => Err(AnnotateError::JsonDecode(format!(
            "'{}' must be an array",
            PASSAGES_KEY
        ))),
    }
}

fn parse_annotations(
    root: &Map<String, Value>,
) -> Result<BTreeMap<usize, Vec<Annotation>>, AnnotateError> {
    let tables = match root.get(ANNOTATIONS_KEY) {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(tables)) => tables,
        Some(_) => {
            return Err(AnnotateError::JsonDecode(format!(
                "'{}' must be an object",
                ANNOTATIONS_KEY
            )))
        }
    };

    let mut annotations = BTreeMap::new();
    for (key, rows) in tables {
        let Ok(position) = key.trim().parse::<usize>() else {
            warn!("Skipping annotations under non-numeric key '{}'", key);
            continue;
        };
        let rows = match rows {
            Value::Array(rows) => rows,
            Value::Null => {
                annotations.insert(position, Vec::new());
                continue;
            }
            _ => {
                return Err(AnnotateError::JsonDecode(format!(
                    "annotations for passage {} must be an array",
                    position
                )))
            }
        };

        let mut parsed = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Value::Object(record) => parsed.push(parse_record(record)),
                other => warn!(
                    "Skipping non-object annotation record for passage {}: {}",
                    position, other
                ),
            }
        }
        annotations.insert(position, parsed);
    }

    Ok(annotations)
}

fn parse_record(record: &Map<String, Value>) -> Annotation {
    let mut annotation = Annotation::default();
    for field in AnnotationField::ALL {
        if let Some(value) = record.get(field.column()) {
            annotation.set(field, value_to_text(value));
        }
    }
    annotation
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_export_shape() {
        let mut annotations = BTreeMap::new();
        annotations.insert(0, vec![Annotation::new("Fuchs", "", "")]);
        let corpus = Corpus::from_parts(
            vec![
                "Der Fuchs springt.".to_string(),
                "Der Hund schläft.".to_string(),
            ],
            annotations,
        );

        let bytes = JsonCodec::default().export(&corpus).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "text_passages": ["Der Fuchs springt.", "Der Hund schläft."],
                "annotations": {
                    "0": [{"Citation": "Fuchs", "Metadata": "", "Annotation_Text": ""}],
                    "1": []
                }
            })
        );
    }

    #[test]
    fn test_export_keeps_utf8() {
        let corpus = Corpus::from_passages(["schläft"]);
        let text = String::from_utf8(JsonCodec::new(false).export(&corpus).unwrap()).unwrap();
        assert!(text.contains("schläft"));
        assert_eq!(text, r#"{"text_passages":["schläft"],"annotations":{"0":[]}}"#);
    }

    #[test]
    fn test_export_numeric_key_order() {
        let corpus = Corpus::from_passages((0..12).map(|i| format!("p{}", i)));
        let text = String::from_utf8(JsonCodec::new(false).export(&corpus).unwrap()).unwrap();
        let two = text.find("\"2\"").unwrap();
        let ten = text.find("\"10\"").unwrap();
        assert!(two < ten);
    }

    #[test]
    fn test_import_missing_sections() {
        let corpus = JsonCodec::default().import(b"{}").unwrap();
        assert!(corpus.is_empty());

        let corpus = JsonCodec::default()
            .import(br#"{"annotations": {"0": [{"Citation": "x"}]}}"#)
            .unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_import_ignores_extra_fields_and_found_flag() {
        let input = br#"{
            "text_passages": ["Der Fuchs springt."],
            "annotations": {
                "0": [{
                    "Citation": "Fuchs",
                    "Metadata": 2023,
                    "Found in Text": "yes",
                    "color": "green"
                }]
            }
        }"#;
        let corpus = JsonCodec::default().import(input).unwrap();
        assert_eq!(corpus.annotations(0), &[Annotation::new("Fuchs", "2023", "")]);
    }

    #[test]
    fn test_import_tolerates_odd_keys_and_nulls() {
        let input = br#"{
            "text_passages": ["a", null, "c"],
            "annotations": {
                "x": [{"Citation": "lost"}],
                "2": null,
                "1": [{"Citation": null, "Metadata": "m"}, 5],
                "9": [{"Citation": "stray"}]
            }
        }"#;
        let corpus = JsonCodec::default().import(input).unwrap();
        assert_eq!(
            corpus.passages(),
            &["a".to_string(), String::new(), "c".to_string()]
        );
        assert!(corpus.annotations(0).is_empty());
        assert_eq!(corpus.annotations(1), &[Annotation::new("", "m", "")]);
        assert!(corpus.annotations(2).is_empty());
    }

    #[test]
    fn test_import_syntax_error() {
        let err = JsonCodec::default().import(b"{\"text_passages\": [").unwrap_err();
        assert!(matches!(err, AnnotateError::JsonDecode(_)));
    }

    #[test]
    fn test_import_wrong_types() {
        assert!(JsonCodec::default().import(b"[]").is_err());
        assert!(JsonCodec::default()
            .import(br#"{"text_passages": "abc"}"#)
            .is_err());
        assert!(JsonCodec::default()
            .import(br#"{"text_passages": [], "annotations": []}"#)
            .is_err());
    }

    #[test]
    fn test_round_trip_sample() {
        let codec = JsonCodec::default();
        let corpus = Corpus::sample();
        let back = codec.import(&codec.export(&corpus).unwrap()).unwrap();
        assert_eq!(back, corpus);
    }

    #[test]
    fn test_to_value() {
        let value = JsonCodec::to_value(&Corpus::from_passages(["a"])).unwrap();
        assert_eq!(value, json!({"text_passages": ["a"], "annotations": {"0": []}}));
    }
}
