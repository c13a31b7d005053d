//! Text accumulation with offset-tracked inline references.
//!
//! A [`SpanTracker`] consumes the walk events of one paragraph-equivalent
//! unit and produces its normalized text plus the spans of every inline
//! reference in it.
//!
//! Normalization collapses every whitespace run to one space and trims the
//! unit at both ends. A pending space is only written once the next visible
//! character arrives, so span starts never include the separating space and
//! a reference at the end of a unit never leaves trailing whitespace.
//!
//! Nested reference markers are flattened to the innermost one: entering a
//! reference supersedes every reference still open around it, so a nesting
//! chain yields at most one span.

use crate::document::{AssetKind, Span, SpanKind};
use crate::markup::{classify_inline, reference_target, Element, InlineRole, TreeWalker, WalkEvent};

/// Receiver for assets met inside running text.
pub trait AssetSink {
    /// Register an inline formula or footnote and return its asset-id.
    fn register_placeholder(&mut self, element: &Element, kind: AssetKind) -> String;

    /// Register a figure or table nested in running text.
    fn register_detached(&mut self, element: &Element);
}

/// Normalized unit text and its spans, sorted by start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedText {
    /// Normalized text
    pub text: String,
    /// Spans in non-decreasing start order
    pub spans: Vec<Span>,
}

#[derive(Debug)]
struct OpenReference {
    depth: usize,
    start: Option<usize>,
    kind: SpanKind,
    target_id: String,
    superseded: bool,
}

/// Accumulates one unit's text while recording reference spans.
pub struct SpanTracker<'s, S: AssetSink + ?Sized> {
    sink: &'s mut S,
    glyph: char,
    text: String,
    cursor: usize,
    pending_space: bool,
    depth: usize,
    skip_depth: usize,
    excluded: &'static [&'static str],
    open: Vec<OpenReference>,
    spans: Vec<Span>,
}

impl<'s, S: AssetSink + ?Sized> SpanTracker<'s, S> {
    /// Create a tracker that writes `glyph` in place of inline assets.
    pub fn new(sink: &'s mut S, glyph: char) -> Self {
        Self {
            sink,
            glyph,
            text: String::new(),
            cursor: 0,
            pending_space: false,
            depth: 0,
            skip_depth: 0,
            excluded: &[],
            open: Vec::new(),
            spans: Vec::new(),
        }
    }

    /// Track the content of `element` (the element itself is the unit).
    pub fn track(sink: &'s mut S, glyph: char, element: &Element) -> TrackedText {
        Self::track_excluding(sink, glyph, element, &[])
    }

    /// Like [`SpanTracker::track`], leaving out subtrees with an `excluded` tag.
    pub fn track_excluding(
        sink: &'s mut S,
        glyph: char,
        element: &Element,
        excluded: &'static [&'static str],
    ) -> TrackedText {
        let mut tracker = Self::new(sink, glyph);
        tracker.excluded = excluded;
        for event in TreeWalker::inner(element) {
            tracker.feed(event);
        }
        tracker.finish()
    }

    /// Consume one walk event.
    pub fn feed(&mut self, event: WalkEvent<'_>) {
        match event {
            WalkEvent::Enter(element) => self.enter(element),
            WalkEvent::Text(text) => {
                if self.skip_depth == 0 {
                    self.push_text(text);
                }
            },
            WalkEvent::Exit(_) => self.exit(),
        }
    }

    /// Close the unit.
    pub fn finish(mut self) -> TrackedText {
        while let Some(open) = self.open.pop() {
            self.close(open);
        }
        self.spans.sort_by_key(|span| span.start);
        TrackedText {
            text: self.text,
            spans: self.spans,
        }
    }

    fn enter(&mut self, element: &Element) {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return;
        }
        if self.excluded.iter().any(|tag| element.is(tag)) {
            self.skip_depth = 1;
            return;
        }
        match classify_inline(element) {
            InlineRole::Reference(kind) => {
                self.depth += 1;
                for open in &mut self.open {
                    open.superseded = true;
                }
                self.open.push(OpenReference {
                    depth: self.depth,
                    start: None,
                    kind,
                    target_id: reference_target(element),
                    superseded: false,
                });
            },
            InlineRole::Placeholder(kind) => {
                let asset_id = self.sink.register_placeholder(element, kind);
                let span_kind = match kind {
                    AssetKind::Equation => SpanKind::EquationRef,
                    _ => SpanKind::FootnoteRef,
                };
                for open in self.open.iter_mut().filter(|open| open.kind == span_kind) {
                    open.superseded = true;
                }
                let start = self.push_char(self.glyph);
                self.spans
                    .push(Span::new(start, start + 1, span_kind, asset_id));
                self.skip_depth = 1;
            },
            InlineRole::Detached => {
                self.sink.register_detached(element);
                self.skip_depth = 1;
            },
            InlineRole::Transparent => self.depth += 1,
        }
    }

    fn exit(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        if self.open.last().map_or(false, |open| open.depth == self.depth) {
            if let Some(open) = self.open.pop() {
                self.close(open);
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn close(&mut self, open: OpenReference) {
        if open.superseded {
            log::trace!("dropping outer {} span around nested reference", open.kind.as_str());
            return;
        }
        let start = open.start.unwrap_or(self.cursor);
        self.spans
            .push(Span::new(start, self.cursor, open.kind, open.target_id));
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.push_char(c);
            }
        }
    }

    /// Write one visible character, flushing a pending space first.
    /// Returns the offset the character landed at.
    fn push_char(&mut self, c: char) -> usize {
        if self.pending_space && !self.text.is_empty() {
            self.text.push(' ');
            self.cursor += 1;
        }
        self.pending_space = false;
        for open in &mut self.open {
            if open.start.is_none() {
                open.start = Some(self.cursor);
            }
        }
        let at = self.cursor;
        self.text.push(c);
        self.cursor += 1;
        at
    }
}
