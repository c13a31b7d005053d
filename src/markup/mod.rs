//! Mixed-content markup trees.
//!
//! The converter works on an owned element tree where text runs and child
//! elements are interleaved in document order, the way TEI XML produced by
//! a document-structuring service nests them.
//!
//! ## Overview
//!
//! - [`Element`] / [`Node`]: the tree itself
//! - [`builder`]: builds trees from XML text or from a token stream,
//!   rejecting unbalanced input with a structural error
//! - [`walker`]: depth-first, document-order event iteration
//! - [`tags`]: the closed tag-to-role classification table
//!
//! ## Example
//!
//! ```
//! use tei_oxide::markup::{parse_xml, TreeWalker, WalkEvent};
//!
//! let tree = parse_xml("<p>See <ref type=\"bibr\" target=\"#b1\">[1]</ref>.</p>", 64)?;
//! let texts: Vec<&str> = TreeWalker::new(&tree)
//!     .filter_map(|event| match event {
//!         WalkEvent::Text(text) => Some(text),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(texts, vec!["See ", "[1]", "."]);
//! # Ok::<(), tei_oxide::Error>(())
//! ```

pub mod builder;
pub mod tags;
pub mod walker;

pub use builder::{build_tree, check_depth, parse_xml, Token, TreeBuilder};
pub use tags::{classify_block, classify_inline, reference_target, BlockRole, InlineRole};
pub use walker::{TreeWalker, WalkEvent};

/// A child of an element: nested element or text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element
    Element(Element),
    /// Text run, whitespace preserved as found in the source
    Text(String),
}

/// An element of the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local tag name (namespace prefix stripped)
    pub tag: String,

    /// Attributes in source order, keys kept verbatim (`xml:id`, `type`, ...)
    pub attributes: Vec<(String, String)>,

    /// Children in document order
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a text run.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Look up an attribute value by key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The element's own markup identifier (`xml:id`, falling back to `id`).
    pub fn id(&self) -> Option<&str> {
        self.attr("xml:id")
            .or_else(|| self.attr("id"))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Whether the element has the given tag.
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Direct child elements, skipping text runs.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First direct child with the given tag.
    pub fn find_child(&self, tag: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.is(tag))
    }

    /// First descendant (pre-order, excluding `self`) with the given tag.
    pub fn find_descendant(&self, tag: &str) -> Option<&Element> {
        self.descendants().find(|element| element.is(tag))
    }

    /// All descendants (pre-order, excluding `self`) with the given tag.
    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        self.descendants()
            .filter(|element| element.is(tag))
            .collect()
    }

    /// Pre-order iterator over every descendant element, excluding `self`.
    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        TreeWalker::new(self)
            .skip(1)
            .filter_map(|event| match event {
                WalkEvent::Enter(element) => Some(element),
                _ => None,
            })
    }

    /// Concatenated descendant text, whitespace untouched.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for event in TreeWalker::new(self) {
            if let WalkEvent::Text(text) = event {
                out.push_str(text);
            }
        }
        out
    }

    /// Descendant text with whitespace runs collapsed and ends trimmed.
    pub fn normalized_text(&self) -> String {
        collapse_whitespace(&self.text())
    }

    /// Text with a word break at every element boundary, then normalized.
    ///
    /// Used for bibliography nodes, where sibling fields such as
    /// `<forename>` and `<surname>` are often not separated by whitespace.
    pub fn rendered_text(&self) -> String {
        let mut out = String::new();
        for event in TreeWalker::new(self) {
            match event {
                WalkEvent::Text(text) => out.push_str(text),
                _ => out.push(' '),
            }
        }
        collapse_whitespace(&out)
    }
}

/// Collapse whitespace runs to a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
