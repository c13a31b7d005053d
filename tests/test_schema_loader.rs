//! Tests for persisted record loading.
//!
//! Current records must round-trip through a file unchanged; earlier
//! layouts must be migrated; unknown versions must be rejected.

use serde_json::json;
use tei_oxide::{
    load_document, load_document_file, save_document_file, AssetContent, AssetKind,
    DocumentAssembler, Error, SpanKind, StructuralUnit, CURRENT_SCHEMA_VERSION,
};

const SAMPLE: &str = include_str!("fixtures/sample.tei.xml");

// =============================================================================
// Current version
// =============================================================================

mod current_version_tests {
    use super::*;

    #[test]
    fn test_file_round_trip() {
        let doc = DocumentAssembler::new()
            .convert_xml(SAMPLE, "sample")
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        save_document_file(&doc, &path).unwrap();
        let loaded = load_document_file(&path).unwrap();

        assert_eq!(loaded, doc);
        assert_eq!(loaded.to_json().unwrap(), doc.to_json().unwrap());
    }

    #[test]
    fn test_current_version_tag() {
        let doc = DocumentAssembler::new()
            .convert_xml("<TEI><text><body><p>x</p></body></text></TEI>", "tag")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["schema_version"], json!(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

// =============================================================================
// Earlier versions
// =============================================================================

mod migration_tests {
    use super::*;

    fn v1_record() -> serde_json::Value {
        json!({
            "paper_id": "s2orc-1",
            "pdf_parse": {
                "abstract": [
                    {"text": "Short abstract.", "cite_spans": [], "ref_spans": [], "section": "Abstract"}
                ],
                "body_text": [
                    {
                        "text": "As shown in [1], see Table 1.",
                        "cite_spans": [{"start": 12, "end": 15, "text": "[1]", "ref_id": "BIBREF0"}],
                        "ref_spans": [{"start": 21, "end": 28, "text": "Table 1", "ref_id": "TABREF0"}],
                        "eq_spans": [],
                        "section": "Introduction",
                        "sec_num": "1"
                    },
                    {
                        "text": "Unknown [9].",
                        "cite_spans": [{"start": 8, "end": 11, "text": "[9]", "ref_id": "BIBREF9"}],
                        "ref_spans": [],
                        "section": "Introduction"
                    }
                ],
                "back_matter": [],
                "bib_entries": {
                    "BIBREF0": {
                        "ref_id": "b0",
                        "title": "A cited work",
                        "authors": [{"first": "Grace", "middle": [], "last": "Hopper", "suffix": ""}],
                        "year": 1952,
                        "venue": "Journal",
                        "link": "12345",
                        "other_ids": {"DOI": ["10.1/abc"], "PMID": []}
                    }
                },
                "ref_entries": {
                    "TABREF0": {"text": "Results", "type": "table", "content": "a b c"}
                }
            },
            "metadata": {
                "title": "Old Record",
                "authors": [{"first": "Alan", "middle": [], "last": "Turing", "suffix": ""}],
                "year": 1950
            }
        })
    }

    #[test]
    fn test_v1_record_loads() {
        let doc = load_document(&v1_record().to_string()).unwrap();
        assert_eq!(doc.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(doc.paper_id, "s2orc-1");
        assert_eq!(doc.title, "Old Record");
        assert_eq!(doc.year.as_deref(), Some("1950"));
        assert_eq!(doc.authors[0].last, "Turing");
        assert_eq!(doc.abstract_paragraphs[0].text, "Short abstract.");
    }

    #[test]
    fn test_v1_sections_and_spans() {
        let doc = load_document(&v1_record().to_string()).unwrap();
        assert_eq!(doc.body.len(), 3);
        match &doc.body[0] {
            StructuralUnit::Header(h) => {
                assert_eq!(h.text, "Introduction");
                assert_eq!(h.number.as_deref(), Some("1"));
            },
            other => panic!("expected header, got {:?}", other),
        }

        let p = doc.body[1].as_paragraph().unwrap();
        assert_eq!(p.section_path, vec!["Introduction"]);
        assert_eq!(p.spans[0].kind, SpanKind::Citation);
        assert_eq!(p.span_text(&p.spans[0]), "[1]");
        assert!(p.spans[0].resolved);
        assert_eq!(p.spans[1].kind, SpanKind::TableRef);
        assert_eq!(p.span_text(&p.spans[1]), "Table 1");

        let missing = &doc.body[2].as_paragraph().unwrap().spans[0];
        assert!(!missing.resolved);
        assert_eq!(doc.diagnostics.unresolved_references, 1);
    }

    #[test]
    fn test_v1_entries() {
        let doc = load_document(&v1_record().to_string()).unwrap();
        let entry = &doc.bibliography["BIBREF0"];
        assert_eq!(entry.title.as_deref(), Some("A cited work"));
        assert_eq!(entry.year, Some(1952));
        assert_eq!(entry.doi(), Some("10.1/abc"));
        assert!(!entry.identifiers.contains_key("PMID"));

        let table = &doc.assets["TABREF0"];
        assert_eq!(table.kind, AssetKind::Table);
        assert_eq!(
            table.content,
            Some(AssetContent::RawText {
                text: "a b c".to_string()
            })
        );
    }

    #[test]
    fn test_v2_record_loads() {
        let v2 = json!({
            "schema_version": 2,
            "paper_id": "v2",
            "body": [
                {"type": "paragraph", "text": "See [1].", "section_path": [],
                 "spans": [{"start": 4, "end": 7, "kind": "citation", "target_id": "b0", "resolved": true}]}
            ],
            "bibliography": [{"ref_id": "b0", "raw_text": "Some reference."}],
            "assets": [{"asset_id": "fig_0", "kind": "figure", "text": "Caption"}],
            "unresolved_references": 0,
            "warnings": [{"kind": "missing_target", "span_kind": "figure-ref", "location": "body[0]"}]
        });
        let doc = load_document(&v2.to_string()).unwrap();
        assert_eq!(doc.bibliography["b0"].raw_text, "Some reference.");
        assert_eq!(doc.assets["fig_0"].text, "Caption");
        assert_eq!(doc.diagnostics.unresolved_references, 0);
        assert_eq!(doc.diagnostics.warnings.len(), 1);
    }
}

// =============================================================================
// Rejected records
// =============================================================================

mod rejection_tests {
    use super::*;

    #[test]
    fn test_newer_version_rejected() {
        let err = load_document(r#"{"schema_version": 4, "paper_id": "x"}"#).unwrap_err();
        match err {
            Error::UnsupportedSchemaVersion { found, supported } => {
                assert_eq!(found, "4");
                assert_eq!(supported, CURRENT_SCHEMA_VERSION);
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            load_document("[1, 2, 3]"),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_unparseable_json() {
        assert!(matches!(load_document("{not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_v2_entry_without_id() {
        let v2 = json!({"schema_version": 2, "paper_id": "x", "assets": [{"kind": "figure"}]});
        assert!(matches!(
            load_document(&v2.to_string()),
            Err(Error::InvalidRecord(_))
        ));
    }
}
