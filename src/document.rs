//! Structured document record.
//!
//! This is the output of [`DocumentAssembler`](crate::assembler::DocumentAssembler)
//! and the in-memory shape the [`schema`](crate::schema) loader migrates old
//! records into.
//!
//! All offsets count Unicode scalar values (`char`s) of the unit text, so a
//! downstream consumer indexing by code point lands on the same characters.

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Kind of inline cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanKind {
    /// In-text citation of a bibliography entry
    Citation,
    /// Reference to a figure
    FigureRef,
    /// Reference to a table
    TableRef,
    /// Reference to an equation
    EquationRef,
    /// Reference to a footnote
    FootnoteRef,
}

impl SpanKind {
    /// Whether spans of this kind point into the bibliography.
    pub fn targets_bibliography(&self) -> bool {
        matches!(self, SpanKind::Citation)
    }

    /// Name used in the persisted record.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Citation => "citation",
            SpanKind::FigureRef => "figure-ref",
            SpanKind::TableRef => "table-ref",
            SpanKind::EquationRef => "equation-ref",
            SpanKind::FootnoteRef => "footnote-ref",
        }
    }
}

/// Offset-addressed inline reference inside a unit's text.
///
/// `start..end` is half-open and counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// First character covered
    pub start: usize,
    /// One past the last character covered
    pub end: usize,
    /// Reference kind
    pub kind: SpanKind,
    /// Bibliography or asset key this span points to
    pub target_id: String,
    /// Whether `target_id` names an existing entry
    #[serde(default)]
    pub resolved: bool,
}

impl Span {
    /// Create an unresolved span.
    pub fn new(start: usize, end: usize, kind: SpanKind, target_id: impl Into<String>) -> Self {
        Self {
            start,
            end,
            kind,
            target_id: target_id.into(),
            resolved: false,
        }
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no characters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paragraph-equivalent unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Normalized text
    pub text: String,
    /// Spans in non-decreasing start order
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Ancestor header texts, outermost first
    #[serde(default)]
    pub section_path: Vec<String>,
}

impl Paragraph {
    /// Create a paragraph without spans.
    pub fn new(text: impl Into<String>, section_path: Vec<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
            section_path,
        }
    }

    /// Text length in offset units.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The text a span covers.
    pub fn span_text(&self, span: &Span) -> String {
        self.text
            .chars()
            .skip(span.start)
            .take(span.len())
            .collect()
    }
}

/// Section header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// 1 for top-level sections
    pub level: usize,
    /// Header text, possibly empty
    pub text: String,
    /// Spans over `text`, sorted by start
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Section number from the markup (`head@n`)
    #[serde(default)]
    pub number: Option<String>,
    /// Ancestor header texts, including this header when non-empty.
    /// Placeholder glyphs are left out of path entries.
    #[serde(default)]
    pub section_path: Vec<String>,
}

/// Header or paragraph in final document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralUnit {
    /// Section header
    Header(Header),
    /// Paragraph-equivalent unit
    Paragraph(Paragraph),
}

impl StructuralUnit {
    /// The paragraph, if this unit is one.
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            StructuralUnit::Paragraph(p) => Some(p),
            StructuralUnit::Header(_) => None,
        }
    }

    /// The header, if this unit is one.
    pub fn as_header(&self) -> Option<&Header> {
        match self {
            StructuralUnit::Header(h) => Some(h),
            StructuralUnit::Paragraph(_) => None,
        }
    }

    /// Unit text.
    pub fn text(&self) -> &str {
        match self {
            StructuralUnit::Header(h) => &h.text,
            StructuralUnit::Paragraph(p) => &p.text,
        }
    }

    /// Spans over the unit text.
    pub fn spans(&self) -> &[Span] {
        match self {
            StructuralUnit::Header(h) => &h.spans,
            StructuralUnit::Paragraph(p) => &p.spans,
        }
    }

    pub(crate) fn spans_mut(&mut self) -> &mut Vec<Span> {
        match self {
            StructuralUnit::Header(h) => &mut h.spans,
            StructuralUnit::Paragraph(p) => &mut p.spans,
        }
    }
}

/// Author affiliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    /// Laboratory name
    #[serde(default)]
    pub laboratory: String,
    /// Institution name
    #[serde(default)]
    pub institution: String,
    /// Address parts keyed by their element name (`settlement`, `country`, ...)
    #[serde(default)]
    pub location: IndexMap<String, String>,
}

impl Affiliation {
    /// Whether nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.laboratory.is_empty() && self.institution.is_empty() && self.location.is_empty()
    }
}

/// Paper or cited-work author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// First given name
    #[serde(default)]
    pub first: String,
    /// Further given names
    #[serde(default)]
    pub middle: Vec<String>,
    /// Family name
    #[serde(default)]
    pub last: String,
    /// Role or generational suffix ("Jr.", "Dr.")
    #[serde(default)]
    pub suffix: String,
    /// Affiliation, paper authors only
    #[serde(default)]
    pub affiliation: Option<Affiliation>,
    /// Contact address, paper authors only
    #[serde(default)]
    pub email: Option<String>,
}

impl Author {
    /// Whether no name part is present.
    pub fn is_blank(&self) -> bool {
        self.first.is_empty() && self.middle.is_empty() && self.last.is_empty()
    }

    /// Name parts used for deduplication.
    pub fn name_key(&self) -> (String, Vec<String>, String, String) {
        (
            self.first.clone(),
            self.middle.clone(),
            self.last.clone(),
            self.suffix.clone(),
        )
    }
}

/// Normalized bibliography entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibEntry {
    /// Key in [`Document::bibliography`]
    pub ref_id: String,
    /// Citation string as rendered in the source
    #[serde(default)]
    pub raw_text: String,
    /// Title of the cited work
    #[serde(default)]
    pub title: Option<String>,
    /// Authors in order
    #[serde(default)]
    pub authors: Vec<Author>,
    /// Journal, proceedings or series
    #[serde(default)]
    pub venue: Option<String>,
    /// Volume
    #[serde(default)]
    pub volume: Option<String>,
    /// Issue
    #[serde(default)]
    pub issue: Option<String>,
    /// Page range, `from--to` when both ends are known
    #[serde(default)]
    pub pages: Option<String>,
    /// Publication year
    #[serde(default)]
    pub year: Option<u32>,
    /// External identifiers by scheme (`DOI`, `arXiv`, `PMID`, ...)
    #[serde(default)]
    pub identifiers: IndexMap<String, Vec<String>>,
    /// Links found on the entry
    #[serde(default)]
    pub urls: Vec<String>,
    /// Markup ids of duplicate nodes merged into this entry
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl BibEntry {
    /// First DOI, if any.
    pub fn doi(&self) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|(scheme, _)| scheme.eq_ignore_ascii_case("doi"))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Asset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Figure
    Figure,
    /// Table
    Table,
    /// Equation
    Equation,
    /// Footnote
    Footnote,
}

impl AssetKind {
    /// Prefix of generated asset ids (`figure-0`, `table-3`, ...).
    pub fn prefix(&self) -> &'static str {
        match self {
            AssetKind::Figure => "figure",
            AssetKind::Table => "table",
            AssetKind::Equation => "equation",
            AssetKind::Footnote => "footnote",
        }
    }
}

/// Structured sub-content of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum AssetContent {
    /// Rectangular cell grid
    Grid {
        /// Rows of cell text, all the same length
        rows: Vec<Vec<String>>,
    },
    /// Table that could not be captured as a grid
    RawText {
        /// Cell text in reading order
        text: String,
    },
}

/// Figure, table, equation or footnote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Key in [`Document::assets`]
    pub asset_id: String,
    /// Asset kind
    pub kind: AssetKind,
    /// Caption (figures, tables) or content (equations, footnotes)
    #[serde(default)]
    pub text: String,
    /// Label such as "(1)" or "Figure 2"
    #[serde(default)]
    pub label: Option<String>,
    /// References inside `text`
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Table cells
    #[serde(default)]
    pub content: Option<AssetContent>,
    /// Graphic locations
    #[serde(default)]
    pub uris: Vec<String>,
}

impl AssetEntry {
    /// Create an entry with text only.
    pub fn new(asset_id: impl Into<String>, kind: AssetKind, text: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
            text: text.into(),
            label: None,
            spans: Vec::new(),
            content: None,
            uris: Vec::new(),
        }
    }
}

/// Citation convention detected from in-text citation surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    /// Numbered markers such as "[3]" or "[1, 4-6]"
    Bracket,
    /// Name and year markers such as "Smith et al. (2020)"
    AuthorYear,
    /// No citations found
    #[default]
    Unknown,
}

/// Versioned structured record of one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Output format version
    pub schema_version: u32,
    /// Paper identifier supplied by the caller
    pub paper_id: String,
    /// Paper title
    #[serde(default)]
    pub title: String,
    /// Paper authors in order
    #[serde(default)]
    pub authors: Vec<Author>,
    /// Publication year from the header
    #[serde(default)]
    pub year: Option<String>,
    /// Abstract paragraphs
    #[serde(default, rename = "abstract")]
    pub abstract_paragraphs: Vec<Paragraph>,
    /// Body units in reading order
    #[serde(default)]
    pub body: Vec<StructuralUnit>,
    /// Acknowledgements, appendices and other back matter
    #[serde(default)]
    pub back_matter: Vec<StructuralUnit>,
    /// Bibliography keyed by ref-id, in first-seen order
    #[serde(default)]
    pub bibliography: IndexMap<String, BibEntry>,
    /// Assets keyed by asset-id, in document order
    #[serde(default)]
    pub assets: IndexMap<String, AssetEntry>,
    /// Detected citation convention
    #[serde(default)]
    pub citation_style: CitationStyle,
    /// Recovered conditions met during conversion
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl Document {
    /// Create an empty document at the current schema version.
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            schema_version: crate::schema::CURRENT_SCHEMA_VERSION,
            paper_id: paper_id.into(),
            title: String::new(),
            authors: Vec::new(),
            year: None,
            abstract_paragraphs: Vec::new(),
            body: Vec::new(),
            back_matter: Vec::new(),
            bibliography: IndexMap::new(),
            assets: IndexMap::new(),
            citation_style: CitationStyle::Unknown,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Every paragraph: abstract, then body, then back matter.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.abstract_paragraphs.iter().chain(
            self.body
                .iter()
                .chain(self.back_matter.iter())
                .filter_map(StructuralUnit::as_paragraph),
        )
    }

    /// Every span in headers, paragraphs and asset texts.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.abstract_paragraphs
            .iter()
            .flat_map(|p| p.spans.iter())
            .chain(
                self.body
                    .iter()
                    .chain(self.back_matter.iter())
                    .flat_map(|unit| unit.spans().iter()),
            )
            .chain(self.assets.values().flat_map(|a| a.spans.iter()))
    }

    /// Number of spans left unresolved.
    pub fn unresolved_count(&self) -> usize {
        self.diagnostics.unresolved_references
    }

    /// Abstract text, one paragraph per line.
    pub fn raw_abstract_text(&self) -> String {
        self.abstract_paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Body paragraph text, one paragraph per line.
    pub fn raw_body_text(&self) -> String {
        self.body
            .iter()
            .filter_map(StructuralUnit::as_paragraph)
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Compact JSON record.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON record.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
