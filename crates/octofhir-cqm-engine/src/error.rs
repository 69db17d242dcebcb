//! Engine errors
//!
//! The engine keeps its error surface deliberately small. Dangling child
//! references and malformed persisted blobs are handled locally (skipped or
//! decoded to defaults, see the model crate's `persist` module); only
//! conditions the engine cannot reason past become errors.

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the canonicalization/scoring engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Component shape the engine cannot reason about. Structurally
    /// impossible through the model crate's sum types; kept for collaborators
    /// that construct shapes dynamically.
    #[error("Invalid component variant: {detail}")]
    InvalidVariant { detail: String },

    /// A clause or composite graph revisited a node during a recursive walk.
    /// Trees are acyclic by construction upstream, but an upstream bug must
    /// not become infinite recursion here.
    #[error("Cycle detected at node: {node_id}")]
    CycleDetected { node_id: String },
}

impl EngineError {
    /// Create an invalid-variant error
    pub fn invalid_variant(detail: impl Into<String>) -> Self {
        Self::InvalidVariant {
            detail: detail.into(),
        }
    }

    /// Create a cycle-detected error
    pub fn cycle(node_id: impl Into<String>) -> Self {
        Self::CycleDetected {
            node_id: node_id.into(),
        }
    }
}
