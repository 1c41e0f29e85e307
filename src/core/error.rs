// This module defines the rejection taxonomy for the bufferization safety analysis using
// the thiserror crate for idiomatic Rust error handling. RejectReason is the main enum
// covering every way a fusion candidate can be turned down: non-comparable designators,
// operations with unenumerable effects, proven or unresolved aliasing, potentially
// reallocating assignments, extra observers of the elemental value, and finalization
// obligations. Each variant carries a human-readable detail string for diagnostics.
// A rejection is terminal for the candidate being analyzed but never fatal to the
// enclosing run: the caller logs it and moves on to the next candidate. CollectError
// covers the two failure modes of the effect collector and maps into the taxonomy.

//! Rejection reasons for the bufferization safety analysis.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Why the safety prover refused to fuse a candidate.
///
/// Every rejection path returns one of these; the prover never panics.
/// Rejection is a normal outcome meaning "keep the buffered temporary."
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("unanalyzable effect: {0}")]
    UnanalyzableEffect(String),

    #[error("aliasing hazard: {0}")]
    AliasingHazard(String),

    #[error("shape or allocation hazard: {0}")]
    ShapeOrAllocationHazard(String),

    #[error("usage count hazard: {0}")]
    UsageCountHazard(String),

    #[error("finalization hazard: {0}")]
    FinalizationHazard(String),
}

impl RejectReason {
    /// Stable tag used for per-reason statistics.
    pub fn tag(&self) -> &'static str {
        match self {
            RejectReason::StructuralMismatch(_) => "structural-mismatch",
            RejectReason::UnanalyzableEffect(_) => "unanalyzable-effect",
            RejectReason::AliasingHazard(_) => "aliasing-hazard",
            RejectReason::ShapeOrAllocationHazard(_) => "shape-or-allocation-hazard",
            RejectReason::UsageCountHazard(_) => "usage-count-hazard",
            RejectReason::FinalizationHazard(_) => "finalization-hazard",
        }
    }
}

/// Failure modes of the effect collector.
///
/// `Unanalyzable` is a single signal with no partial results: callers must
/// assume the worst. `NotStraightLine` reports span endpoints that are not
/// in one block with the start properly dominating the end; it is an input
/// validation result, not an assertion failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectError {
    #[error("operation with unknown effects in the scanned span")]
    Unanalyzable,

    #[error("span endpoints are not in straight-line dominance order")]
    NotStraightLine,
}

impl From<CollectError> for RejectReason {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::Unanalyzable => RejectReason::UnanalyzableEffect(err.to_string()),
            CollectError::NotStraightLine => RejectReason::StructuralMismatch(err.to_string()),
        }
    }
}
