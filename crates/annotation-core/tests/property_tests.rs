//! Property-based tests for annotation-core
//!
//! Matching, span selection and JSON persistence using proptest.

use annotation_core::formats::{Codec, JsonCodec};
use annotation_core::highlight::segments;
use annotation_core::matcher::highlight_order;
use annotation_core::{occurs, select_spans, Annotation, AnnotationView, Corpus};
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================
// Strategies
// ============================================================

/// Mixed-case text including German letters and regex metacharacters
fn mixed_text(max: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!(r"[a-zA-ZäöüÄÖÜß .*+?()\[\]]{{0,{}}}", max))
        .expect("valid strategy regex")
}

/// Strings made only of regex metacharacters
fn metacharacters() -> impl Strategy<Value = String> {
    r"[.*+?()\[\]{}|^$\\]{1,6}"
}

fn annotation() -> impl Strategy<Value = Annotation> {
    ("[a-zA-Z ]{0,12}", ".{0,12}", ".{0,20}")
        .prop_map(|(citation, metadata, text)| Annotation::new(citation, metadata, text))
}

fn corpus() -> impl Strategy<Value = Corpus> {
    prop::collection::vec(
        (".{0,40}", prop::collection::vec(annotation(), 0..4)),
        0..5,
    )
    .prop_map(|entries| {
        let mut passages = Vec::new();
        let mut annotations = BTreeMap::new();
        for (position, (text, rows)) in entries.into_iter().enumerate() {
            passages.push(text);
            annotations.insert(position, rows);
        }
        Corpus::from_parts(passages, annotations)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // ============================================================
    // Matching
    // ============================================================

    #[test]
    fn occurs_ignores_case(citation in mixed_text(6), text in mixed_text(40)) {
        prop_assert_eq!(
            occurs(&citation, &text),
            occurs(&citation.to_uppercase(), &text.to_lowercase())
        );
    }

    #[test]
    fn empty_citation_never_occurs(text in mixed_text(40)) {
        prop_assert!(!occurs("", &text));
    }

    #[test]
    fn nothing_occurs_in_empty_text(citation in mixed_text(10)) {
        prop_assert!(!occurs(&citation, ""));
    }

    #[test]
    fn embedded_citation_always_occurs(
        prefix in mixed_text(10),
        citation in "[a-zA-Zäöü]{1,8}",
        suffix in mixed_text(10)
    ) {
        let text = format!("{}{}{}", prefix, citation, suffix);
        prop_assert!(occurs(&citation, &text));
    }

    #[test]
    fn metacharacters_match_literally(
        citation in metacharacters(),
        prefix in "[a-z ]{0,10}",
        suffix in "[a-z ]{0,10}"
    ) {
        let text = format!("{}{}{}", prefix, citation, suffix);
        prop_assert!(occurs(&citation, &text));

        let spans = select_spans(&text, [citation.as_str()]);
        prop_assert_eq!(spans.len(), 1);
        prop_assert_eq!(&text[spans[0].as_range()], citation.as_str());
        prop_assert_eq!(spans[0].start, prefix.len());

        // only letters and spaces remain once the citation is cut out
        let surrounding = format!("{}{}", prefix, suffix);
        prop_assert!(!occurs(&citation, &surrounding));
    }

    #[test]
    fn found_flag_matches_occurs(text in mixed_text(30), citation in mixed_text(5)) {
        let view = AnnotationView::new(&Annotation::new(citation.clone(), "", ""), &text);
        prop_assert_eq!(view.found_in_text, occurs(&citation, &text));
    }

    // ============================================================
    // Span selection
    // ============================================================

    #[test]
    fn spans_are_sorted_disjoint_and_literal(
        text in mixed_text(60),
        citations in prop::collection::vec(mixed_text(5), 0..5)
    ) {
        let spans = select_spans(&text, citations.iter().map(String::as_str));

        for pair in spans.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
        for span in &spans {
            prop_assert!(!span.is_empty());
            let marked = &text[span.as_range()];
            prop_assert!(citations.iter().any(|c| c == marked));
        }
        // one mark per distinct citation at most
        prop_assert!(spans.len() <= highlight_order(citations.iter().map(String::as_str)).len());
    }

    #[test]
    fn span_selection_ignores_input_order_for_distinct_lengths(
        text in mixed_text(60),
        citations in prop::collection::vec("[a-zA-Z ]{1,6}", 1..5)
    ) {
        let mut lengths: Vec<usize> = citations.iter().map(|c| c.chars().count()).collect();
        lengths.sort_unstable();
        lengths.dedup();
        prop_assume!(lengths.len() == citations.len());

        let forward = select_spans(&text, citations.iter().map(String::as_str));
        let backward = select_spans(&text, citations.iter().rev().map(String::as_str));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn segments_rebuild_the_text(
        text in mixed_text(60),
        citations in prop::collection::vec(mixed_text(4), 0..4)
    ) {
        let spans = select_spans(&text, citations.iter().map(String::as_str));
        let rebuilt: String = segments(&text, &spans).into_iter().map(|(piece, _)| piece).collect();
        prop_assert_eq!(rebuilt, text);
    }

    // ============================================================
    // Persistence
    // ============================================================

    #[test]
    fn json_round_trip_is_lossless(corpus in corpus()) {
        let codec = JsonCodec::new(false);
        let bytes = codec.export(&corpus).expect("export");
        let back = codec.import(&bytes).expect("import");
        prop_assert_eq!(back, corpus);
    }

    #[test]
    fn json_import_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        let _ = JsonCodec::default().import(&bytes);
    }
}
