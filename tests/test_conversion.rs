//! Integration tests for TEI conversion.
//!
//! Covers the end-to-end path from XML text (or token streams) to the
//! assembled document: reading order, section paths, span offsets,
//! bibliography merging, assets and the resolution pass.

use tei_oxide::markup::Token;
use tei_oxide::{
    AssetContent, AssetKind, CitationStyle, ConverterConfig, Document, DocumentAssembler, Error,
    SpanKind, StructuralUnit, Warning,
};

const SAMPLE: &str = include_str!("fixtures/sample.tei.xml");

fn convert(xml: &str) -> Document {
    DocumentAssembler::new()
        .convert_xml(xml, "test")
        .expect("conversion should succeed")
}

fn body_xml(body: &str) -> String {
    format!("<TEI><text><body>{}</body></text></TEI>", body)
}

fn paragraph(doc: &Document, index: usize) -> &tei_oxide::Paragraph {
    doc.body[index]
        .as_paragraph()
        .unwrap_or_else(|| panic!("unit {} is not a paragraph", index))
}

// =============================================================================
// Span offsets
// =============================================================================

mod span_tests {
    use super::*;

    #[test]
    fn test_citation_and_table_reference_offsets() {
        let doc = convert(&body_xml(
            r##"<p>See <ref type="bibr" target="#b1">[1]</ref> and <ref type="table" target="#t2">Table 2</ref>.</p>"##,
        ));
        let p = paragraph(&doc, 0);
        assert_eq!(p.text, "See [1] and Table 2.");
        assert_eq!(p.spans.len(), 2);

        let cite = &p.spans[0];
        assert_eq!((cite.start, cite.end), (4, 7));
        assert_eq!(cite.kind, SpanKind::Citation);
        assert_eq!(cite.target_id, "b1");
        assert_eq!(p.span_text(cite), "[1]");

        let table = &p.spans[1];
        assert_eq!((table.start, table.end), (12, 19));
        assert_eq!(table.kind, SpanKind::TableRef);
        assert_eq!(table.target_id, "t2");
        assert_eq!(p.span_text(table), "Table 2");
    }

    #[test]
    fn test_offsets_count_characters_not_bytes() {
        let doc = convert(&body_xml(
            r##"<p>Schrödinger’s cat <ref type="bibr" target="#b0">[1]</ref></p>"##,
        ));
        let p = paragraph(&doc, 0);
        let span = &p.spans[0];
        assert_eq!(p.span_text(span), "[1]");
        assert_eq!(span.end, p.char_len());
    }

    #[test]
    fn test_spans_within_text_bounds() {
        let doc = convert(SAMPLE);
        for p in doc.paragraphs() {
            for span in &p.spans {
                assert!(span.start <= span.end);
                assert!(span.end <= p.char_len(), "span {:?} beyond {:?}", span, p.text);
            }
        }
    }
}

// =============================================================================
// Structure
// =============================================================================

mod structure_tests {
    use super::*;

    #[test]
    fn test_sample_body_layout() {
        let doc = convert(SAMPLE);
        let kinds: Vec<&str> = doc
            .body
            .iter()
            .map(|unit| match unit {
                StructuralUnit::Header(_) => "H",
                StructuralUnit::Paragraph(_) => "P",
            })
            .collect();
        assert_eq!(kinds, vec!["H", "P", "P", "H", "H", "P", "P", "P", "H"]);

        let sparsity = doc.body[4].as_header().unwrap();
        assert_eq!(sparsity.level, 2);
        assert_eq!(sparsity.number.as_deref(), Some("2.1"));
        assert_eq!(paragraph(&doc, 5).section_path, vec!["Method", "Sparsity"]);
        assert_eq!(doc.body[8].text(), "Empty Section");
    }

    #[test]
    fn test_paragraph_without_section_has_empty_path() {
        let doc = convert(&body_xml("<p>Loose paragraph.</p>"));
        assert!(paragraph(&doc, 0).section_path.is_empty());
    }

    #[test]
    fn test_inline_placeholders_in_sample() {
        let doc = convert(SAMPLE);
        let p = paragraph(&doc, 2);
        assert_eq!(p.text, "The cost grows as \u{FFFC} with length\u{FFFC}.");
        assert_eq!(p.spans.len(), 2);
        assert_eq!((p.spans[0].start, p.spans[0].end), (18, 19));
        assert_eq!(p.spans[0].target_id, "formula_inline");
        assert_eq!((p.spans[1].start, p.spans[1].end), (31, 32));
        assert_eq!(p.spans[1].kind, SpanKind::FootnoteRef);
    }

    #[test]
    fn test_block_formula_paragraph() {
        let doc = convert(SAMPLE);
        let p = paragraph(&doc, 6);
        assert_eq!(p.text, "\u{FFFC}");
        assert_eq!(p.spans[0].kind, SpanKind::EquationRef);
        assert_eq!(p.spans[0].target_id, "formula_0");
        assert_eq!(doc.assets["formula_0"].label.as_deref(), Some("(1)"));
    }

    #[test]
    fn test_abstract_and_back_matter() {
        let doc = convert(SAMPLE);
        assert_eq!(doc.abstract_paragraphs.len(), 1);
        assert_eq!(doc.abstract_paragraphs[0].section_path, vec!["Abstract"]);
        assert_eq!(
            doc.raw_abstract_text(),
            "We study attention over long inputs [1]."
        );

        assert_eq!(doc.back_matter.len(), 2);
        let ack = doc.back_matter[1].as_paragraph().unwrap();
        assert_eq!(ack.text, "We thank the reviewers.");
        assert_eq!(ack.section_path, vec!["acknowledgement", "Acknowledgements"]);
    }

    #[test]
    fn test_header_metadata() {
        let doc = convert(SAMPLE);
        assert_eq!(doc.title, "Sparse Attention for Long Documents");
        assert_eq!(doc.year.as_deref(), Some("2021"));
        assert_eq!(doc.authors.len(), 2);
        let ada = &doc.authors[0];
        assert_eq!((ada.first.as_str(), ada.last.as_str()), ("Ada", "Lovelace"));
        assert_eq!(ada.middle, vec!["M"]);
        assert_eq!(ada.email.as_deref(), Some("ada@example.org"));
        let aff = ada.affiliation.as_ref().unwrap();
        assert_eq!(aff.institution, "Analytical University");
    }
}

// =============================================================================
// Bibliography and resolution
// =============================================================================

mod resolution_tests {
    use super::*;

    #[test]
    fn test_duplicate_bibliography_nodes_merge() {
        let doc = convert(SAMPLE);
        assert_eq!(doc.bibliography.len(), 2);
        let survivor = &doc.bibliography["b0"];
        assert_eq!(survivor.aliases, vec!["b2"]);
        assert_eq!(survivor.doi(), Some("10.5555/3295222.3295349"));

        // The footnote cited b2; the span now targets b0.
        let note = doc
            .assets
            .values()
            .find(|a| a.kind == AssetKind::Footnote)
            .unwrap();
        assert_eq!(note.spans[0].target_id, "b0");
        assert!(note.spans[0].resolved);
    }

    #[test]
    fn test_scenario_merge_repoints_spans() {
        let xml = r##"<TEI><text>
            <body><p><ref type="bibr" target="#r1">[1]</ref> and <ref type="bibr" target="#r2">[2]</ref></p></body>
            <back><listBibl>
              <biblStruct xml:id="r1"><note type="raw_reference">Smith, J. (2020). Title. Venue.</note></biblStruct>
              <biblStruct xml:id="r2"><note type="raw_reference">Smith, J. (2020). Title. Venue.</note></biblStruct>
            </listBibl></back>
        </text></TEI>"##;
        let doc = convert(xml);
        assert_eq!(doc.bibliography.len(), 1);
        let p = paragraph(&doc, 0);
        assert!(p.spans.iter().all(|s| s.target_id == "r1" && s.resolved));
        assert_eq!(doc.diagnostics.unresolved_references, 0);
    }

    #[test]
    fn test_unresolved_target_is_kept_and_counted() {
        let doc = convert(SAMPLE);
        assert_eq!(doc.diagnostics.unresolved_references, 1);
        let missing = doc.spans().find(|s| s.target_id == "b99").unwrap();
        assert!(!missing.resolved);
        assert!(doc.diagnostics.warnings.iter().any(|w| matches!(
            w,
            Warning::UnresolvedReference { target_id, .. } if target_id == "b99"
        )));
        assert_eq!(doc.spans().filter(|s| !s.resolved).count(), 1);
    }

    #[test]
    fn test_reference_without_target() {
        let doc = convert(&body_xml(r#"<p>See <ref type="figure">Fig. 3</ref>.</p>"#));
        let span = &paragraph(&doc, 0).spans[0];
        assert_eq!(span.target_id, "");
        assert!(!span.resolved);
        assert_eq!(doc.diagnostics.unresolved_references, 1);
    }

    #[test]
    fn test_empty_reference_paragraph_is_counted() {
        let doc = convert(&body_xml(r##"<p><ref type="bibr" target="#b9"></ref></p>"##));
        assert_eq!(doc.body.len(), 1);
        let span = &paragraph(&doc, 0).spans[0];
        assert_eq!((span.start, span.end), (0, 0));
        assert!(!span.resolved);
        assert_eq!(doc.diagnostics.unresolved_references, 1);
        assert!(doc.diagnostics.warnings.contains(&Warning::UnresolvedReference {
            span_kind: SpanKind::Citation,
            target_id: "b9".to_string(),
            location: "body[0]".to_string(),
        }));
    }

    #[test]
    fn test_header_note_and_citation_are_kept() {
        let doc = convert(&body_xml(
            r##"<div><head>Intro<note place="foot">secret <ref type="bibr" target="#b9">[1]</ref></note></head><p>x</p></div>"##,
        ));
        let header = doc.body[0].as_header().unwrap();
        assert_eq!(header.text, "Intro\u{FFFC}");
        assert_eq!(header.spans[0].kind, SpanKind::FootnoteRef);
        assert!(header.spans[0].resolved);

        let note = &doc.assets["footnote-0"];
        assert_eq!(note.text, "secret [1]");
        assert!(!note.spans[0].resolved);
        assert_eq!(doc.diagnostics.unresolved_references, 1);
        assert_eq!(doc.spans().count(), 2);
    }

    #[test]
    fn test_header_citation_resolves() {
        let doc = convert(
            r##"<TEI><text><body><div><head>On <ref type="bibr" target="#b0">[1]</ref></head></div></body>
            <back><div type="references"><listBibl><biblStruct xml:id="b0"><analytic><title level="a">Cited</title></analytic></biblStruct></listBibl></div></back></text></TEI>"##,
        );
        let header = doc.body[0].as_header().unwrap();
        assert_eq!(header.text, "On [1]");
        assert_eq!((header.spans[0].start, header.spans[0].end), (3, 6));
        assert!(header.spans[0].resolved);
        assert_eq!(doc.diagnostics.unresolved_references, 0);
    }

    #[test]
    fn test_citation_inside_equation_is_counted() {
        let doc = convert(&body_xml(
            r##"<formula xml:id="eq_1">a <ref type="bibr" target="#b9">[1]</ref><label>(1)</label></formula>"##,
        ));
        let eq = &doc.assets["eq_1"];
        assert_eq!(eq.text, "a [1]");
        assert_eq!(eq.label.as_deref(), Some("(1)"));
        assert_eq!(eq.spans[0].target_id, "b9");
        assert!(!eq.spans[0].resolved);
        assert_eq!(doc.diagnostics.unresolved_references, 1);
        assert!(doc.diagnostics.warnings.iter().any(|w| matches!(
            w,
            Warning::UnresolvedReference { location, .. } if location == "assets[eq_1]"
        )));
    }

    #[test]
    fn test_citation_style() {
        let doc = convert(SAMPLE);
        assert_eq!(doc.citation_style, CitationStyle::AuthorYear);

        let config = ConverterConfig::default().with_bracket_style_threshold(2);
        let doc = DocumentAssembler::with_config(config)
            .convert_xml(SAMPLE, "test")
            .unwrap();
        assert_eq!(doc.citation_style, CitationStyle::Bracket);

        let doc = convert(&body_xml("<p>No citations.</p>"));
        assert_eq!(doc.citation_style, CitationStyle::Unknown);
    }
}

// =============================================================================
// Assets
// =============================================================================

mod asset_tests {
    use super::*;

    #[test]
    fn test_assets_in_document_order() {
        let doc = convert(SAMPLE);
        let ids: Vec<&str> = doc.assets.keys().map(String::as_str).collect();
        assert_eq!(
            ids,
            vec!["formula_inline", "footnote-0", "formula_0", "fig_0", "tab_0", "tab_1"]
        );
    }

    #[test]
    fn test_table_grid_and_ragged_table() {
        let doc = convert(SAMPLE);
        match doc.assets["tab_0"].content.as_ref() {
            Some(AssetContent::Grid { rows }) => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[2], vec!["Sparse", "73.9"]);
            },
            other => panic!("expected grid, got {:?}", other),
        }
        assert!(matches!(
            doc.assets["tab_1"].content,
            Some(AssetContent::RawText { .. })
        ));
        assert!(doc.diagnostics.warnings.contains(&Warning::MalformedTable {
            asset_id: "tab_1".to_string(),
            row_lengths: vec![3, 3, 2],
        }));
    }

    #[test]
    fn test_figure_caption_spans_resolve() {
        let doc = convert(SAMPLE);
        let fig = &doc.assets["fig_0"];
        assert_eq!(fig.text, "Speed-up over dense attention [2].");
        assert_eq!(fig.uris, vec!["figures/speedup.png"]);
        assert_eq!(fig.spans[0].target_id, "b1");
        assert!(fig.spans[0].resolved);
    }
}

// =============================================================================
// Determinism and input handling
// =============================================================================

mod input_tests {
    use super::*;

    #[test]
    fn test_reassembly_is_byte_identical() {
        let first = convert(SAMPLE).to_json().unwrap();
        let second = convert(SAMPLE).to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_tree_is_structural_error() {
        let err = DocumentAssembler::new()
            .convert_xml("<TEI><text><body><p>open</body></text></TEI>", "bad")
            .unwrap_err();
        assert!(matches!(err, Error::Structural { .. }));
    }

    #[test]
    fn test_depth_limit_is_structural_error() {
        let mut xml = String::new();
        for _ in 0..20 {
            xml.push_str("<div>");
        }
        for _ in 0..20 {
            xml.push_str("</div>");
        }
        let config = ConverterConfig::default().with_max_depth(10);
        let err = DocumentAssembler::with_config(config)
            .convert_xml(&xml, "deep")
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_token_stream_input() {
        let tokens = vec![
            Token::start("body"),
            Token::start("p"),
            Token::text("Plain "),
            Token::Start {
                tag: "ref".to_string(),
                attributes: vec![
                    ("type".to_string(), "bibr".to_string()),
                    ("target".to_string(), "#b0".to_string()),
                ],
            },
            Token::text("[1]"),
            Token::end("ref"),
            Token::end("p"),
            Token::end("body"),
        ];
        let doc = DocumentAssembler::new()
            .convert_tokens(tokens, "tokens")
            .unwrap();
        let p = paragraph(&doc, 0);
        assert_eq!(p.text, "Plain [1]");
        assert_eq!((p.spans[0].start, p.spans[0].end), (6, 9));
    }

    #[test]
    fn test_unbalanced_token_stream() {
        let tokens = vec![Token::start("body"), Token::start("p"), Token::end("body")];
        let err = DocumentAssembler::new()
            .convert_tokens(tokens, "bad")
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_convert_file_uses_stem_as_paper_id() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("sample.tei.xml");
        let doc = DocumentAssembler::new().convert_file(&path).unwrap();
        assert_eq!(doc.paper_id, "sample");
    }
}
