//! Tree construction from XML text or token streams.
//!
//! Both entry points validate balance while building, so a caller never
//! receives a partially built tree: the first mismatched, stray or unclosed
//! element aborts with [`Error::Structural`].

use super::{Element, Node, TreeWalker, WalkEvent};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One token of a flat markup stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening tag with its attributes
    Start {
        /// Tag name
        tag: String,
        /// Attributes in source order
        attributes: Vec<(String, String)>,
    },
    /// Text run
    Text(String),
    /// Closing tag
    End {
        /// Tag name
        tag: String,
    },
}

impl Token {
    /// Opening tag without attributes.
    pub fn start(tag: impl Into<String>) -> Self {
        Token::Start {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    /// Closing tag.
    pub fn end(tag: impl Into<String>) -> Self {
        Token::End { tag: tag.into() }
    }

    /// Text run.
    pub fn text(text: impl Into<String>) -> Self {
        Token::Text(text.into())
    }
}

/// Incremental, validating tree builder.
#[derive(Debug)]
pub struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
    max_depth: usize,
}

impl TreeBuilder {
    /// Create a builder that rejects trees nested deeper than `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            root: None,
            max_depth,
        }
    }

    /// Feed one token; `position` is reported in errors.
    pub fn push(&mut self, token: Token, position: usize) -> Result<()> {
        match token {
            Token::Start { tag, attributes } => {
                if self.root.is_some() {
                    return Err(Error::structural(
                        position,
                        format!("second root element <{}>", tag),
                    ));
                }
                if self.stack.len() >= self.max_depth {
                    return Err(Error::structural(
                        position,
                        format!("nesting deeper than {} levels", self.max_depth),
                    ));
                }
                self.stack.push(Element {
                    tag,
                    attributes,
                    children: Vec::new(),
                });
            },
            Token::Text(text) => match self.stack.last_mut() {
                Some(parent) => {
                    if !text.is_empty() {
                        parent.children.push(Node::Text(text));
                    }
                },
                None => {
                    if !text.trim().is_empty() {
                        return Err(Error::structural(
                            position,
                            "text outside the root element",
                        ));
                    }
                },
            },
            Token::End { tag } => {
                let element = self.stack.pop().ok_or_else(|| {
                    Error::structural(position, format!("unexpected end tag </{}>", tag))
                })?;
                if element.tag != tag {
                    return Err(Error::structural(
                        position,
                        format!("expected </{}>, found </{}>", element.tag, tag),
                    ));
                }
                match self.stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => self.root = Some(element),
                }
            },
        }
        Ok(())
    }

    /// Finish building; fails if elements are still open or nothing was built.
    pub fn finish(self, position: usize) -> Result<Element> {
        if let Some(open) = self.stack.last() {
            return Err(Error::structural(
                position,
                format!("unclosed element <{}>", open.tag),
            ));
        }
        self.root
            .ok_or_else(|| Error::structural(position, "no root element"))
    }
}

/// Build a tree from a token stream. Errors report the token index.
pub fn build_tree<I>(tokens: I, max_depth: usize) -> Result<Element>
where
    I: IntoIterator<Item = Token>,
{
    let mut builder = TreeBuilder::new(max_depth);
    let mut count = 0;
    for (index, token) in tokens.into_iter().enumerate() {
        builder.push(token, index)?;
        count = index + 1;
    }
    builder.finish(count)
}

/// Parse XML text into a tree. Errors report the byte offset.
///
/// Comments, processing instructions and the DOCTYPE are dropped; CDATA is
/// kept as text. Tag names lose their namespace prefix, attribute keys keep it.
pub fn parse_xml(xml: &str, max_depth: usize) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    // Balance is checked by TreeBuilder so every failure surfaces as Error::Structural.
    reader.check_end_names(false);

    let mut builder = TreeBuilder::new(max_depth);

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let token = start_token(&e, position)?;
                builder.push(token, position)?;
            },
            Ok(Event::Empty(e)) => {
                let token = start_token(&e, position)?;
                let tag = local_name(&e);
                builder.push(token, position)?;
                builder.push(Token::End { tag }, position)?;
            },
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                builder.push(Token::End { tag }, position)?;
            },
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| {
                    Error::structural(position, format!("invalid text content: {}", err))
                })?;
                builder.push(Token::Text(text.into_owned()), position)?;
            },
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                builder.push(Token::Text(text), position)?;
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::structural(
                    reader.buffer_position(),
                    format!("XML syntax error: {}", e),
                ));
            },
            _ => {},
        }
    }

    builder.finish(reader.buffer_position())
}

/// Reject a tree nested deeper than `max_depth` (for trees built by callers).
pub fn check_depth(root: &Element, max_depth: usize) -> Result<()> {
    let mut depth = 0usize;
    for (index, event) in TreeWalker::new(root).enumerate() {
        match event {
            WalkEvent::Enter(element) => {
                depth += 1;
                if depth > max_depth {
                    return Err(Error::structural(
                        index,
                        format!("<{}> nested deeper than {} levels", element.tag, max_depth),
                    ));
                }
            },
            WalkEvent::Exit(_) => depth -= 1,
            WalkEvent::Text(_) => {},
        }
    }
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn start_token(e: &BytesStart<'_>, position: usize) -> Result<Token> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            Error::structural(position, format!("malformed attribute: {}", err))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|err| {
            Error::structural(position, format!("invalid attribute value: {}", err))
        })?;
        attributes.push((key, value.into_owned()));
    }
    Ok(Token::Start {
        tag: local_name(e),
        attributes,
    })
}
