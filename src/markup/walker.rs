//! Depth-first, document-order traversal of markup trees.
//!
//! The walker keeps an explicit stack instead of recursing, so arbitrarily
//! deep section nesting cannot exhaust the call stack.

use super::{Element, Node};

/// One traversal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent<'a> {
    /// An element is entered; its tag and attributes are available on the element
    Enter(&'a Element),
    /// A text run, whitespace not yet normalized
    Text(&'a str),
    /// The element entered earlier is left
    Exit(&'a Element),
}

impl<'a> WalkEvent<'a> {
    /// Tag name for enter/exit events.
    pub fn tag(&self) -> Option<&'a str> {
        match self {
            WalkEvent::Enter(element) | WalkEvent::Exit(element) => Some(element.tag.as_str()),
            WalkEvent::Text(_) => None,
        }
    }
}

#[derive(Debug)]
struct Frame<'a> {
    element: &'a Element,
    next_child: usize,
}

/// Iterator producing [`WalkEvent`]s in document order.
///
/// Every element yields exactly one `Enter` and one matching `Exit`, and
/// text runs appear in their original order.
#[derive(Debug)]
pub struct TreeWalker<'a> {
    root: &'a Element,
    stack: Vec<Frame<'a>>,
    started: bool,
    include_root: bool,
}

impl<'a> TreeWalker<'a> {
    /// Walk `root` including its own enter/exit events.
    pub fn new(root: &'a Element) -> Self {
        Self {
            root,
            stack: Vec::new(),
            started: false,
            include_root: true,
        }
    }

    /// Walk only the content of `root`, without its own enter/exit events.
    pub fn inner(root: &'a Element) -> Self {
        Self {
            root,
            stack: Vec::new(),
            started: false,
            include_root: false,
        }
    }
}

impl<'a> Iterator for TreeWalker<'a> {
    type Item = WalkEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            self.stack.push(Frame {
                element: self.root,
                next_child: 0,
            });
            if self.include_root {
                return Some(WalkEvent::Enter(self.root));
            }
        }

        loop {
            let (element, index) = {
                let frame = self.stack.last_mut()?;
                let index = frame.next_child;
                frame.next_child += 1;
                (frame.element, index)
            };

            return match element.children.get(index) {
                Some(Node::Text(text)) => Some(WalkEvent::Text(text)),
                Some(Node::Element(child)) => {
                    self.stack.push(Frame {
                        element: child,
                        next_child: 0,
                    });
                    Some(WalkEvent::Enter(child))
                },
                None => {
                    self.stack.pop();
                    if self.stack.is_empty() && !self.include_root {
                        continue;
                    }
                    Some(WalkEvent::Exit(element))
                },
            };
        }
    }
}
