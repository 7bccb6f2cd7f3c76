//! Corpus editing and format round trips through the public API

use annotation_core::{
    export, import, occurs, AnnotateConfig, Annotation, AnnotationField, Corpus, Format,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn fox_and_dog() -> Corpus {
    let mut annotations = BTreeMap::new();
    annotations.insert(0, vec![Annotation::new("Fuchs", "", "")]);
    Corpus::from_parts(
        vec![
            "Der Fuchs springt.".to_string(),
            "Der Hund schläft.".to_string(),
        ],
        annotations,
    )
}

#[test]
fn fox_and_dog_exports_expected_json() {
    let corpus = fox_and_dog();
    assert!(occurs("Fuchs", corpus.passage(0).unwrap()));

    let exported = export(Format::Json, &corpus, &AnnotateConfig::default()).unwrap();
    let value: Value = serde_json::from_slice(&exported.bytes).unwrap();
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
fn sample_survives_every_format() {
    let config = AnnotateConfig::default();
    let corpus = Corpus::sample();

    for format in Format::ALL {
        let exported = export(format, &corpus, &config).unwrap();
        assert_eq!(exported.content_type, format.content_type());
        let back = import(format, &exported.bytes).unwrap();
        assert_eq!(back, corpus, "{} round trip", format);
    }
}

#[test]
fn edited_corpus_survives_document_and_spreadsheet() {
    let config = AnnotateConfig::default();
    let mut corpus = Corpus::sample();
    let position = corpus.add_passage_with_text("Der Fuchs springt über den Zaun.");
    corpus.set_annotation_field(position, 0, AnnotationField::Citation, "Fuchs");
    corpus.set_annotation_field(position, 0, AnnotationField::Metadata, "Aesop, 2023");
    corpus.add_annotation(position);
    corpus.set_annotation_field(position, 1, AnnotationField::AnnotationText, "Bewegung");

    for format in [Format::Document, Format::Spreadsheet] {
        let exported = export(format, &corpus, &config).unwrap();
        let back = import(format, &exported.bytes).unwrap();
        assert_eq!(back.passages(), corpus.passages(), "{}", format);
        for (position, _, rows) in corpus.iter() {
            assert_eq!(back.annotations(position), rows, "{} passage {}", format, position);
        }
    }
}

#[test]
fn removing_a_passage_shifts_later_tables_down() {
    let mut corpus = Corpus::sample();
    let third = corpus.add_passage_with_text("Dritter Absatz.");
    corpus.set_annotation_field(third, 0, AnnotationField::Citation, "Dritter");
    let before = corpus.clone();

    assert!(corpus.remove_passage(1));
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.passage(0), before.passage(0));
    assert_eq!(corpus.annotations(0), before.annotations(0));
    assert_eq!(corpus.passage(1), before.passage(2));
    assert_eq!(corpus.annotations(1), before.annotations(2));
}

#[test]
fn last_passage_cannot_be_removed() {
    let mut corpus = Corpus::from_passages(["Einziger Absatz."]);
    assert!(!corpus.remove_passage(0));
    assert_eq!(corpus.len(), 1);
    assert!(!corpus.remove_passage(5));
}

#[test]
fn out_of_range_edits_are_ignored() {
    let mut corpus = fox_and_dog();
    let before = corpus.clone();

    assert!(!corpus.remove_annotation(0, 3));
    assert!(!corpus.remove_annotation(9, 0));
    assert_eq!(corpus.add_annotation(9), None);
    assert!(!corpus.set_annotation_field(1, 0, AnnotationField::Citation, "Hund"));
    assert!(!corpus.edit_passage_text(2, "neu"));
    assert_eq!(corpus, before);
}

#[test]
fn failed_import_leaves_corpus_untouched() {
    let mut corpus = fox_and_dog();
    let err = corpus
        .replace_from(Format::Spreadsheet, b"PK\x03\x04 broken")
        .unwrap_err();
    assert!(err.is_decode());
    assert_eq!(corpus, fox_and_dog());
}

#[test]
fn found_flags_follow_text_edits() {
    let mut corpus = fox_and_dog();
    assert_eq!(corpus.found_count(0), 1);

    corpus.edit_passage_text(0, "Der Wolf heult.");
    assert_eq!(corpus.found_count(0), 0);
    assert!(!corpus.annotation_views(0)[0].found_in_text);

    corpus.edit_passage_text(0, "DER FUCHS HEULT.");
    assert!(corpus.annotation_views(0)[0].found_in_text);
}
