//! Error and warning types.
//!
//! The engine itself never fails on input shape: anything it cannot use is
//! skipped, and conditions the caller should know about are reported as
//! [`Warning`] values next to the produced diagram. [`FlowError`] covers the
//! surfaces around the engine that read text and files.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for parsing and loading inputs
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors raised while turning raw input text into engine input
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    /// A trace line did not match `path : weight [: issues]`
    #[error("line {line}: expected `path : weight [: issues]`, found `{content}`")]
    InvalidTraceLine {
        /// One-based line number
        line: usize,
        /// The offending line, trimmed
        content: String,
    },

    /// The weight of a trace was not a finite number
    #[error("line {line}: weight `{value}` is not a finite number")]
    InvalidWeight {
        /// One-based line number
        line: usize,
        /// The rejected weight text
        value: String,
    },

    /// A JSON trace batch could not be decoded
    #[error("invalid trace JSON: {0}")]
    TraceJson(#[from] serde_json::Error),

    /// A tree document could not be decoded
    #[error("invalid tree document: {0}")]
    TreeDocument(#[from] json5::Error),

    /// Reading an input file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Creates an invalid trace line error
    pub fn invalid_line(line: usize, content: impl Into<String>) -> Self {
        Self::InvalidTraceLine {
            line,
            content: content.into(),
        }
    }

    /// Creates an invalid weight error
    pub fn invalid_weight(line: usize, value: impl Into<String>) -> Self {
        Self::InvalidWeight {
            line,
            value: value.into(),
        }
    }
}

/// Non-fatal conditions surfaced alongside a finished diagram
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// The cycle resolver ran out of iterations and fell back to dropping
    /// every remaining back edge
    #[error(
        "cycle resolution budget of {iterations} iteration(s) exhausted; dropped {dropped} back edge(s) to force an acyclic graph"
    )]
    CycleBudgetExhausted {
        /// Iterations spent before giving up
        iterations: usize,
        /// Edges removed by the fallback pass
        dropped: usize,
    },

    /// A tree contained the same id twice; the later subtree was skipped
    #[error("tree node `{id}` appears more than once; later occurrence skipped")]
    DuplicateTreeNode {
        /// The repeated id
        id: String,
    },
}
