//! bufopt - Array assignment bufferization analysis.
//!
//! bufopt decides when a lazily evaluated elemental array computation can be
//! fused into an in-place loop over the assignment target instead of being
//! materialized into a temporary buffer. The analysis is purely advisory:
//! it inspects IR through an adaptor trait, never mutates it, and returns
//! either a loop plan or a typed rejection.
//!
//! # Primary Usage
//!
//! ```ignore
//! use bufopt::core::{AnalysisSession, SafetyProver, Verdict};
//! use bumpalo::Bump;
//!
//! // Arena-scoped session: caches and statistics live here.
//! let arena = Bump::new();
//! let session = AnalysisSession::new(&arena);
//!
//! let prover = SafetyProver::new(&ir, &alias_oracle, &dominance, &session);
//! match prover.prove_elemental(op) {
//!     Verdict::Accept(plan) => { /* emit the fused loop */ }
//!     Verdict::Reject(reason) => { /* keep the buffered temporary */ }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Adaptor traits, the section model, the overlap classifier,
//!   the effect collector and the safety prover
//! - [`test_ir`] - Textual IR with a parser, an adaptor implementation, a
//!   rewrite driver and a CHECK-directive runner for testing the analysis

pub mod core;
pub mod test_ir;

// Re-export common types from organized modules
pub use self::core::{
    // Framework traits
    AliasKind, AliasOracle, DominanceOracle, IrAdaptor,
    // Reference decomposition
    ComplexPart, Designator, ElementalDesc, ObserverKind, Subscript,
    // Overlap classification
    classify_overlap, disjoint_sections, ordered_bounds, prove_less, LessProof, OverlapKind,
    SectionDesc,
    // Effects
    effects_between, read_or_write_effect_on, CollectError, EffectInstance, EffectKind,
    // Session management
    AnalysisSession, SessionStats,
    // Decision procedure
    designator_indices, LoopOrdering, LoopPlan, RejectReason, SafetyProver, Verdict,
};
