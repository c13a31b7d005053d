//! Recoverable conditions recorded on a converted document.

use crate::document::SpanKind;
use serde::{Deserialize, Serialize};

/// A recovered condition. Conversion continued; the output records what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A span target names no bibliography or asset entry
    UnresolvedReference {
        /// Kind of the offending span
        span_kind: SpanKind,
        /// Target as found in the markup
        target_id: String,
        /// Where the span lives (`body[3]`, `assets[table-0]`, ...)
        location: String,
    },
    /// A reference element without any target
    MissingTarget {
        /// Kind of the offending span
        span_kind: SpanKind,
        /// Where the span lives
        location: String,
    },
    /// Table rows of unequal length, kept as raw text
    MalformedTable {
        /// Affected asset
        asset_id: String,
        /// Cell count of every row
        row_lengths: Vec<usize>,
    },
    /// A markup id was already taken and a fresh one was generated
    DuplicateIdentifier {
        /// Id found in the markup
        id: String,
        /// Id actually assigned
        assigned: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnresolvedReference {
                span_kind,
                target_id,
                location,
            } => write!(
                f,
                "unresolved {} target '{}' at {}",
                span_kind.as_str(),
                target_id,
                location
            ),
            Warning::MissingTarget {
                span_kind,
                location,
            } => write!(f, "{} without target at {}", span_kind.as_str(), location),
            Warning::MalformedTable {
                asset_id,
                row_lengths,
            } => write!(f, "ragged table {} (row lengths {:?})", asset_id, row_lengths),
            Warning::DuplicateIdentifier { id, assigned } => {
                write!(f, "duplicate id '{}' reassigned to '{}'", id, assigned)
            },
        }
    }
}

/// Audit trail of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Spans left with `resolved == false`
    pub unresolved_references: usize,
    /// Every recovered condition, in the order met
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, logging it.
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Whether the conversion met no recoverable condition.
    pub fn is_clean(&self) -> bool {
        self.unresolved_references == 0 && self.warnings.is_empty()
    }
}
