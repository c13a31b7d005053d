//! Closed tag classification table.
//!
//! Every structural decision the converter makes about an element goes
//! through [`classify_inline`] or [`classify_block`]. Tags not listed fall
//! back to a single defined role: transparent inlining inside a unit,
//! implicit paragraph content at block level.

use super::Element;
use crate::document::{AssetKind, SpanKind};

/// Role of an element met inside a paragraph-equivalent unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRole {
    /// Inline reference marker: its text stays, a span of this kind covers it
    Reference(SpanKind),
    /// Inline formula/footnote: content moves to an asset, one glyph stays
    Placeholder(AssetKind),
    /// Figure or table nested in running text: registered, contributes no text
    Detached,
    /// Anything else: text is inlined, no span
    Transparent,
}

/// Role of an element met between units (inside body, sections, back matter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    /// Section (`div`): may carry a header and nested sections
    Section,
    /// Section header (`head`)
    Header,
    /// Paragraph-equivalent unit
    Paragraph,
    /// Display formula
    Formula,
    /// Figure or table float
    Figure,
    /// Footnote body
    Footnote,
    /// Bibliography list, handled separately
    Bibliography,
    /// Grouping element without meaning of its own
    Container,
    /// Inline content found at block level
    Inline,
}

/// Classify an element inside a unit.
pub fn classify_inline(element: &Element) -> InlineRole {
    match element.tag.as_str() {
        "ref" => match element.attr("type") {
            Some("bibr") => InlineRole::Reference(SpanKind::Citation),
            Some("figure") => InlineRole::Reference(SpanKind::FigureRef),
            Some("table") => InlineRole::Reference(SpanKind::TableRef),
            Some("formula") | Some("equation") => InlineRole::Reference(SpanKind::EquationRef),
            Some("foot") | Some("footnote") | Some("note") => {
                InlineRole::Reference(SpanKind::FootnoteRef)
            },
            _ => InlineRole::Transparent,
        },
        "formula" => InlineRole::Placeholder(AssetKind::Equation),
        "note" => InlineRole::Placeholder(AssetKind::Footnote),
        "figure" => InlineRole::Detached,
        _ => InlineRole::Transparent,
    }
}

/// Classify an element between units.
pub fn classify_block(element: &Element) -> BlockRole {
    match element.tag.as_str() {
        "div" => BlockRole::Section,
        "head" => BlockRole::Header,
        "p" | "ab" | "item" => BlockRole::Paragraph,
        "formula" => BlockRole::Formula,
        "figure" => BlockRole::Figure,
        "note" => BlockRole::Footnote,
        "listBibl" => BlockRole::Bibliography,
        "body" | "back" | "front" | "abstract" | "list" => BlockRole::Container,
        _ => BlockRole::Inline,
    }
}

/// Target identifier named by a reference element.
///
/// Takes the first whitespace-separated pointer of `target` and strips the
/// leading `#`. Returns an empty string when the element names no target.
pub fn reference_target(element: &Element) -> String {
    element
        .attr("target")
        .and_then(|target| target.split_whitespace().next())
        .map(|pointer| pointer.trim_start_matches('#').to_string())
        .unwrap_or_default()
}
