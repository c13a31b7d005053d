//! Section hierarchy flattening.
//!
//! Nested `div`s are walked with an explicit frame stack and re-expressed
//! as a flat sequence of [`StructuralUnit`]s. Each unit carries the texts of
//! its ancestor headers as its section path.

use crate::assets::{track_with, AssetRegistry};
use crate::document::{AssetKind, Header, Paragraph, Span, SpanKind, StructuralUnit};
use crate::markup::{
    classify_block, collapse_whitespace, BlockRole, Element, Node, TreeWalker, WalkEvent,
};
use crate::spans::SpanTracker;

#[derive(Debug)]
struct Frame<'a> {
    element: &'a Element,
    next_child: usize,
    /// Path length to restore when the frame is left
    restore: usize,
    section: bool,
}

/// Flattens one container (body, abstract, a back-matter division).
pub struct StructureFlattener<'r> {
    registry: &'r mut AssetRegistry,
    path: Vec<String>,
    units: Vec<StructuralUnit>,
}

impl<'r> StructureFlattener<'r> {
    /// Create a flattener whose section paths start with `root_path`.
    pub fn new(registry: &'r mut AssetRegistry, root_path: Vec<String>) -> Self {
        Self {
            registry,
            path: root_path,
            units: Vec::new(),
        }
    }

    /// Flatten the children of `container` in document order.
    pub fn flatten(mut self, container: &Element) -> Vec<StructuralUnit> {
        let mut stack = vec![Frame {
            element: container,
            next_child: 0,
            restore: self.path.len(),
            section: false,
        }];
        let mut inline: Vec<&Node> = Vec::new();

        while let Some(frame) = stack.last_mut() {
            let parent = frame.element;
            let index = frame.next_child;
            let restore = frame.restore;
            frame.next_child += 1;

            let Some(child) = parent.children.get(index) else {
                self.flush_inline(&mut inline);
                if let Some(done) = stack.pop() {
                    self.path.truncate(done.restore);
                }
                continue;
            };

            let element = match child {
                Node::Text(_) => {
                    inline.push(child);
                    continue;
                },
                Node::Element(element) => element,
            };

            let role = classify_block(element);
            if role == BlockRole::Inline {
                inline.push(child);
                continue;
            }
            self.flush_inline(&mut inline);

            match role {
                BlockRole::Section | BlockRole::Container => {
                    stack.push(Frame {
                        element,
                        next_child: 0,
                        restore: self.path.len(),
                        section: role == BlockRole::Section,
                    });
                },
                BlockRole::Header => {
                    let level = stack.iter().filter(|f| f.section).count().max(1);
                    self.header(element, level, restore);
                },
                BlockRole::Paragraph => {
                    let tracked = track_with(self.registry, element);
                    self.paragraph(tracked.text, tracked.spans);
                },
                BlockRole::Formula => {
                    let asset_id = self.registry.register(element, AssetKind::Equation);
                    let glyph = self.registry.glyph().to_string();
                    let span = Span::new(0, 1, SpanKind::EquationRef, asset_id);
                    self.paragraph(glyph, vec![span]);
                },
                BlockRole::Figure => {
                    self.registry.register_figure(element);
                },
                BlockRole::Footnote => {
                    self.registry.register(element, AssetKind::Footnote);
                },
                BlockRole::Bibliography => {
                    log::trace!("skipping bibliography list inside section content");
                },
                BlockRole::Inline => {},
            }
        }

        log::debug!("flattened <{}> into {} unit(s)", container.tag, self.units.len());
        self.units
    }

    fn header(&mut self, element: &Element, level: usize, restore: usize) {
        let tracked = track_with(self.registry, element);
        let title = collapse_whitespace(&tracked.text.replace(self.registry.glyph(), " "));
        self.path.truncate(restore);
        if !title.is_empty() {
            self.path.push(title);
        }
        self.units.push(StructuralUnit::Header(Header {
            level,
            text: tracked.text,
            spans: tracked.spans,
            number: element
                .attr("n")
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            section_path: self.path.clone(),
        }));
    }

    /// Push a paragraph unless it has neither text nor spans.
    fn paragraph(&mut self, text: String, spans: Vec<Span>) {
        if text.is_empty() && spans.is_empty() {
            return;
        }
        self.units.push(StructuralUnit::Paragraph(Paragraph {
            text,
            spans,
            section_path: self.path.clone(),
        }));
    }

    /// Emit buffered stray inline content as one implicit paragraph.
    fn flush_inline(&mut self, inline: &mut Vec<&Node>) {
        if inline.is_empty() {
            return;
        }
        let glyph = self.registry.glyph();
        let mut tracker = SpanTracker::new(&mut *self.registry, glyph);
        for node in inline.drain(..) {
            match node {
                Node::Text(text) => tracker.feed(WalkEvent::Text(text)),
                Node::Element(element) => {
                    for event in TreeWalker::new(element) {
                        tracker.feed(event);
                    }
                },
            }
        }
        let tracked = tracker.finish();
        self.paragraph(tracked.text, tracked.spans);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::ids::IdGenerator;
    use crate::markup::parse_xml;

    fn flatten(xml: &str, root_path: &[&str]) -> (Vec<StructuralUnit>, AssetRegistry) {
        let tree = parse_xml(xml, 64).unwrap();
        let mut registry = AssetRegistry::new(IdGenerator::new(), &ConverterConfig::default());
        let root = root_path.iter().map(|s| s.to_string()).collect();
        let units = StructureFlattener::new(&mut registry, root).flatten(&tree);
        (units, registry)
    }

    #[test]
    fn test_nested_sections_carry_paths() {
        let (units, _) = flatten(
            "<body><div><head n=\"1\">Intro</head><p>a</p><div><head>Detail</head><p>b</p></div><p>c</p></div></body>",
            &[],
        );
        let h = units[0].as_header().unwrap();
        assert_eq!((h.level, h.text.as_str(), h.number.as_deref()), (1, "Intro", Some("1")));
        assert_eq!(units[1].as_paragraph().unwrap().section_path, vec!["Intro"]);
        assert_eq!(units[2].as_header().unwrap().level, 2);
        assert_eq!(
            units[3].as_paragraph().unwrap().section_path,
            vec!["Intro", "Detail"]
        );
        assert_eq!(units[4].as_paragraph().unwrap().section_path, vec!["Intro"]);
    }

    #[test]
    fn test_sibling_sections_reset_path() {
        let (units, _) = flatten(
            "<body><div><head>A</head><p>x</p></div><div><head>B</head><p>y</p></div></body>",
            &[],
        );
        assert_eq!(units[3].as_paragraph().unwrap().section_path, vec!["B"]);
    }

    #[test]
    fn test_empty_section_header_is_kept() {
        let (units, _) = flatten("<body><div><head>Empty</head></div><p>root</p></body>", &[]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text(), "Empty");
        assert!(units[1].as_paragraph().unwrap().section_path.is_empty());
    }

    #[test]
    fn test_blank_header_not_pushed_on_path() {
        let (units, _) = flatten("<body><div><head> </head><p>x</p></div></body>", &[]);
        assert_eq!(units[0].text(), "");
        assert!(units[1].as_paragraph().unwrap().section_path.is_empty());
    }

    #[test]
    fn test_root_path_prefix() {
        let (units, _) = flatten("<abstract><div><p>Summary.</p></div></abstract>", &["Abstract"]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].as_paragraph().unwrap().section_path, vec!["Abstract"]);
    }

    #[test]
    fn test_block_formula_and_figure() {
        let (units, registry) = flatten(
            "<body><p>x</p><formula xml:id=\"formula_0\">a+b<label>(1)</label></formula><figure><figDesc>Cap</figDesc></figure></body>",
            &[],
        );
        assert_eq!(units.len(), 2);
        let p = units[1].as_paragraph().unwrap();
        assert_eq!(p.text, "\u{FFFC}");
        assert_eq!(p.spans[0].target_id, "formula_0");
        assert_eq!(registry.get("figure-0").map(|a| a.text.as_str()), Some("Cap"));
        assert_eq!(registry.into_parts().0.len(), 2);
    }

    #[test]
    fn test_stray_inline_content_becomes_paragraph() {
        let (units, _) = flatten(
            "<body>Loose <ref type=\"bibr\" target=\"#b0\">[1]</ref> text<p>next</p></body>",
            &[],
        );
        assert_eq!(units.len(), 2);
        let p = units[0].as_paragraph().unwrap();
        assert_eq!(p.text, "Loose [1] text");
        assert_eq!((p.spans[0].start, p.spans[0].end), (6, 9));
    }

    #[test]
    fn test_empty_paragraphs_skipped() {
        let (units, _) = flatten("<body>\n  <p>  </p>\n  <p>x</p>\n</body>", &[]);
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn test_paragraph_with_only_empty_reference_is_kept() {
        let (units, _) = flatten(r##"<body><p><ref type="bibr" target="#b9"></ref></p></body>"##, &[]);
        assert_eq!(units.len(), 1);
        let p = units[0].as_paragraph().unwrap();
        assert_eq!(p.text, "");
        assert_eq!(p.spans.len(), 1);
        assert_eq!((p.spans[0].start, p.spans[0].end), (0, 0));
        assert_eq!(p.spans[0].target_id, "b9");
    }

    #[test]
    fn test_header_note_becomes_asset_with_spans() {
        let (units, registry) = flatten(
            r##"<body><div><head>Intro<note place="foot">secret <ref type="bibr" target="#b9">[1]</ref></note></head><p>x</p></div></body>"##,
            &[],
        );
        let h = units[0].as_header().unwrap();
        assert_eq!(h.text, "Intro\u{FFFC}");
        assert_eq!(h.spans.len(), 1);
        assert_eq!((h.spans[0].start, h.spans[0].end), (5, 6));
        assert_eq!(h.spans[0].kind, SpanKind::FootnoteRef);
        assert_eq!(h.spans[0].target_id, "footnote-0");
        assert_eq!(h.section_path, vec!["Intro"]);
        assert_eq!(units[1].as_paragraph().unwrap().section_path, vec!["Intro"]);

        let note = registry.get("footnote-0").unwrap();
        assert_eq!(note.text, "secret [1]");
        assert_eq!(note.spans[0].target_id, "b9");
    }
}
