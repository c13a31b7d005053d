//! Document assembly and cross-reference resolution.
//!
//! The assembler runs every conversion stage for one source document, in
//! this order: depth check, header metadata, bibliography, abstract, body,
//! back matter, then a single resolution pass over every span.
//!
//! All state (the id generator, the asset registry) is created per call, so
//! one assembler can convert any number of documents, including from
//! several threads at once.

use crate::assets::AssetRegistry;
use crate::bibliography::{bibliography_nodes, Bibliography, BibliographyNormalizer};
use crate::config::ConverterConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::document::{AssetKind, CitationStyle, Document, Paragraph, Span, StructuralUnit};
use crate::error::Result;
use crate::ids::IdGenerator;
use crate::markup::{build_tree, check_depth, classify_block, parse_xml, BlockRole, Element, Token};
use crate::metadata::{extract_paper_metadata, PaperMetadata};
use crate::schema::CURRENT_SCHEMA_VERSION;
use crate::structure::StructureFlattener;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

lazy_static! {
    /// Numbered citation marker: `[3]`, `[1, 4]`, `[2-5; 9]`.
    static ref BRACKET_CITATION: Regex =
        Regex::new(r"^\[\s*\d+[a-z]?(\s*[,;\-–]\s*\d+[a-z]?)*\s*\]$").unwrap();
}

/// Converts markup trees into [`Document`]s.
///
/// # Example
///
/// ```
/// use tei_oxide::DocumentAssembler;
///
/// let xml = r##"<TEI><text><body><div><head>Intro</head>
///   <p>See <ref type="bibr" target="#b0">[1]</ref>.</p></div></body>
///   <back><listBibl><biblStruct xml:id="b0"><analytic><title level="a">On things</title></analytic></biblStruct></listBibl></back>
/// </text></TEI>"##;
///
/// let doc = DocumentAssembler::new().convert_xml(xml, "paper-1")?;
/// let paragraph = doc.paragraphs().next().unwrap();
/// assert_eq!(paragraph.text, "See [1].");
/// assert!(paragraph.spans[0].resolved);
/// # Ok::<(), tei_oxide::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    config: ConverterConfig,
}

impl DocumentAssembler {
    /// Create an assembler with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler with custom configuration.
    pub fn with_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Parse TEI XML text and convert it.
    pub fn convert_xml(&self, xml: &str, paper_id: &str) -> Result<Document> {
        let root = parse_xml(xml, self.config.max_depth)?;
        self.assemble(&root, paper_id)
    }

    /// Build a tree from a token stream and convert it.
    pub fn convert_tokens<I>(&self, tokens: I, paper_id: &str) -> Result<Document>
    where
        I: IntoIterator<Item = Token>,
    {
        let root = build_tree(tokens, self.config.max_depth)?;
        self.assemble(&root, paper_id)
    }

    /// Read and convert a TEI file; the paper id is the file stem.
    pub fn convert_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)?;
        self.convert_xml(&xml, &paper_id_for(path))
    }

    /// Convert an already built tree.
    pub fn assemble(&self, root: &Element, paper_id: &str) -> Result<Document> {
        check_depth(root, self.config.max_depth)?;

        let header = locate(root, "teiHeader");
        let text = locate(root, "text").unwrap_or(root);
        let metadata = header.map(extract_paper_metadata).unwrap_or_default();

        let mut ids = IdGenerator::new();
        let bibliography = BibliographyNormalizer::new(self.config.clone())
            .normalize(&bibliography_nodes(text), &mut ids);
        let mut registry = AssetRegistry::new(ids, &self.config);

        let abstract_paragraphs = match header.and_then(|h| h.find_descendant("abstract")) {
            Some(node) => {
                let root_path = vec![self.config.abstract_section_name.clone()];
                StructureFlattener::new(&mut registry, root_path)
                    .flatten(node)
                    .into_iter()
                    .filter_map(|unit| match unit {
                        StructuralUnit::Paragraph(p) => Some(p),
                        StructuralUnit::Header(_) => None,
                    })
                    .collect()
            },
            None => Vec::new(),
        };

        let body = match locate(text, "body") {
            Some(node) => StructureFlattener::new(&mut registry, Vec::new()).flatten(node),
            None => Vec::new(),
        };

        let back_matter = match locate(text, "back") {
            Some(node) => self.back_matter(node, &mut registry),
            None => Vec::new(),
        };

        let (assets, asset_warnings) = registry.into_parts();
        let Bibliography {
            entries,
            aliases,
            warnings: bib_warnings,
        } = bibliography;

        let PaperMetadata {
            title,
            authors,
            year,
        } = metadata;
        let mut doc = Document {
            schema_version: CURRENT_SCHEMA_VERSION,
            paper_id: paper_id.to_string(),
            title,
            authors,
            year,
            abstract_paragraphs,
            body,
            back_matter,
            bibliography: entries,
            assets,
            citation_style: CitationStyle::Unknown,
            diagnostics: Diagnostics::default(),
        };
        doc.diagnostics.warnings.extend(bib_warnings);
        doc.diagnostics.warnings.extend(asset_warnings);

        resolve_references(&mut doc, &aliases);
        doc.citation_style = detect_citation_style(&doc, self.config.bracket_style_threshold);

        log::info!(
            "{}: {} body unit(s), {} bibliography entries, {} assets, {} unresolved reference(s)",
            doc.paper_id,
            doc.body.len(),
            doc.bibliography.len(),
            doc.assets.len(),
            doc.diagnostics.unresolved_references
        );
        Ok(doc)
    }

    /// Back-matter divisions, each rooted at its `type` (acknowledgement, annex, ...).
    fn back_matter(&self, back: &Element, registry: &mut AssetRegistry) -> Vec<StructuralUnit> {
        let mut units = Vec::new();
        for child in back.child_elements() {
            match classify_block(child) {
                BlockRole::Section => {
                    let references = child.attr("type") == Some("references");
                    if references || child.find_child("listBibl").is_some() {
                        continue;
                    }
                    let root_path = child
                        .attr("type")
                        .map(|kind| vec![kind.to_string()])
                        .unwrap_or_default();
                    units.extend(StructureFlattener::new(registry, root_path).flatten(child));
                },
                BlockRole::Figure => {
                    registry.register_figure(child);
                },
                BlockRole::Footnote => {
                    registry.register(child, AssetKind::Footnote);
                },
                _ => log::debug!("ignoring <{}> in back matter", child.tag),
            }
        }
        units
    }
}

/// `root` itself when it has the tag, else its first descendant with it.
fn locate<'a>(root: &'a Element, tag: &str) -> Option<&'a Element> {
    if root.is(tag) {
        Some(root)
    } else {
        root.find_descendant(tag)
    }
}

/// Paper id derived from a file name (`paper.tei.xml` → `paper`).
fn paper_id_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.strip_suffix(".tei").map(str::to_string).unwrap_or(stem)
}

/// Resolve every span of `doc` against its bibliography and assets.
///
/// `aliases` maps the markup ids of merged bibliography duplicates to the
/// surviving ref-id; spans citing a duplicate are repointed to the survivor.
/// Unresolved spans keep their original target and are counted.
pub fn resolve_references(doc: &mut Document, aliases: &IndexMap<String, String>) {
    let known: HashSet<String> = doc
        .bibliography
        .keys()
        .chain(doc.assets.keys())
        .cloned()
        .collect();
    let mut diagnostics = std::mem::take(&mut doc.diagnostics);
    let mut resolver = |spans: &mut [Span], location: String| {
        for span in spans.iter_mut() {
            resolve_span(span, &location, aliases, &known, &mut diagnostics);
        }
    };

    for (i, p) in doc.abstract_paragraphs.iter_mut().enumerate() {
        resolver(&mut p.spans, format!("abstract[{}]", i));
    }
    for (i, unit) in doc.body.iter_mut().enumerate() {
        resolver(unit.spans_mut(), format!("body[{}]", i));
    }
    for (i, unit) in doc.back_matter.iter_mut().enumerate() {
        resolver(unit.spans_mut(), format!("back_matter[{}]", i));
    }
    for (id, asset) in doc.assets.iter_mut() {
        resolver(&mut asset.spans, format!("assets[{}]", id));
    }

    doc.diagnostics = diagnostics;
}

fn resolve_span(
    span: &mut Span,
    location: &str,
    aliases: &IndexMap<String, String>,
    known: &HashSet<String>,
    diagnostics: &mut Diagnostics,
) {
    if span.target_id.is_empty() {
        span.resolved = false;
        diagnostics.unresolved_references += 1;
        diagnostics.push(Warning::MissingTarget {
            span_kind: span.kind,
            location: location.to_string(),
        });
        return;
    }
    if let Some(survivor) = aliases.get(&span.target_id) {
        log::debug!("repointing {} to {}", span.target_id, survivor);
        span.target_id = survivor.clone();
    }
    if known.contains(&span.target_id) {
        span.resolved = true;
        return;
    }
    span.resolved = false;
    diagnostics.unresolved_references += 1;
    diagnostics.push(Warning::UnresolvedReference {
        span_kind: span.kind,
        target_id: span.target_id.clone(),
        location: location.to_string(),
    });
}

/// Classify the document's citation convention from body citation surfaces.
pub fn detect_citation_style(doc: &Document, threshold: usize) -> CitationStyle {
    let surfaces: Vec<String> = doc
        .body
        .iter()
        .filter_map(StructuralUnit::as_paragraph)
        .flat_map(|p: &Paragraph| {
            p.spans
                .iter()
                .filter(|span| span.kind.targets_bibliography())
                .map(move |span| p.span_text(span))
        })
        .collect();
    if surfaces.is_empty() {
        return CitationStyle::Unknown;
    }
    let bracketed = surfaces
        .iter()
        .filter(|surface| BRACKET_CITATION.is_match(surface))
        .count();
    if bracketed > threshold {
        CitationStyle::Bracket
    } else {
        CitationStyle::AuthorYear
    }
}
