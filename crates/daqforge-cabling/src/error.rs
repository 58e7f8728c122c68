//! Error types for inventory loading and graph queries.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which of the two inventory files an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryKind {
    /// Front-end fabric (`switch;device` records).
    FrontEnd,
    /// Builder fabric (six comma-separated fields).
    Builder,
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryKind::FrontEnd => f.write_str("front-end inventory"),
            InventoryKind::Builder => f.write_str("builder inventory"),
        }
    }
}

/// Errors from inventory loading and graph queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CablingError {
    /// A line failed to parse. The whole load is aborted: a partially
    /// ingested inventory is unsafe to assign against.
    #[error("{kind} line {line_no}: malformed record '{line}': {reason}")]
    MalformedInventory {
        /// Inventory the line came from.
        kind: InventoryKind,
        /// 1-based line number.
        line_no: usize,
        /// The offending line, verbatim.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A query named a switch or host the graph does not know.
    #[error("unknown {kind}: '{name}'")]
    NotFound {
        /// What was looked up ("switch", "host").
        kind: &'static str,
        /// The name that missed.
        name: String,
    },
}

impl CablingError {
    /// Create a malformed-inventory error.
    pub fn malformed(
        kind: InventoryKind,
        line_no: usize,
        line: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CablingError::MalformedInventory {
            kind,
            line_no,
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CablingError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display_carries_context() {
        let err = CablingError::malformed(
            InventoryKind::FrontEnd,
            7,
            "sw-fe-01",
            "expected 'switch;device'",
        );
        let msg = err.to_string();
        assert!(msg.contains("front-end inventory"), "got: {msg}");
        assert!(msg.contains("line 7"), "got: {msg}");
        assert!(msg.contains("sw-fe-01"), "got: {msg}");
    }

    #[test]
    fn not_found_display() {
        let err = CablingError::not_found("switch", "sw-nope");
        assert_eq!(err.to_string(), "unknown switch: 'sw-nope'");
    }
}
