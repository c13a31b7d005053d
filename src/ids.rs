//! Per-document identifier generation.
//!
//! One generator is owned by each conversion and shared by the bibliography
//! and the asset registry, so ref-ids and asset-ids never collide.

use std::collections::{HashMap, HashSet};

/// Outcome of claiming an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedId {
    /// The element's own markup id was free and is used as-is
    Markup(String),
    /// A sequential id was generated
    Generated(String),
}

impl AssignedId {
    /// The assigned id.
    pub fn as_str(&self) -> &str {
        match self {
            AssignedId::Markup(id) | AssignedId::Generated(id) => id,
        }
    }

    /// Consume into the id string.
    pub fn into_string(self) -> String {
        match self {
            AssignedId::Markup(id) | AssignedId::Generated(id) => id,
        }
    }
}

/// Deterministic id source scoped to one document.
#[derive(Debug, Default)]
pub struct IdGenerator {
    taken: HashSet<String>,
    counters: HashMap<&'static str, usize>,
}

impl IdGenerator {
    /// Create an empty generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `preferred` if free, else the next `<prefix>-<n>` not yet taken.
    pub fn claim(&mut self, preferred: Option<&str>, prefix: &'static str) -> AssignedId {
        if let Some(id) = preferred {
            if self.reserve(id) {
                return AssignedId::Markup(id.to_string());
            }
        }
        loop {
            let counter = self.counters.entry(prefix).or_insert(0);
            let candidate = format!("{}-{}", prefix, counter);
            *counter += 1;
            if self.reserve(&candidate) {
                return AssignedId::Generated(candidate);
            }
        }
    }

    /// Mark `id` as taken. Returns false if it already was.
    pub fn reserve(&mut self, id: &str) -> bool {
        if self.taken.contains(id) {
            return false;
        }
        self.taken.insert(id.to_string());
        true
    }

    /// Whether `id` has been handed out or reserved.
    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }
}
