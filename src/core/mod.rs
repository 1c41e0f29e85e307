// This module serves as the central hub for the bufferization analysis core,
// providing the building blocks shared by every IR frontend: the adaptor and oracle
// traits (IrAdaptor, AliasOracle, DominanceOracle), the section model (normalized
// array-section descriptors with ordered bounds and a conservative three-valued
// less-than prover), the overlap classifier (deciding whether two array references
// denote the same elements, disjoint elements, or something unknowable), the effect
// collector (fail-closed straight-line memory effect gathering), the analysis session
// (arena-backed caches and decision statistics), and the safety prover itself (the
// two-phase decision procedure producing loop plans or typed rejections). None of the
// components mutate IR; they only answer questions about it.

//! Core analysis infrastructure.
//!
//! Everything here is generic over an [`IrAdaptor`], so the same decision
//! procedure runs against the textual test IR and against a real compiler
//! IR alike.
//!
//! # Key Components
//!
//! ## Adaptor Traits (`adaptor`)
//! - [`IrAdaptor`] exposes the IR queries the analysis needs
//! - [`AliasOracle`] and [`DominanceOracle`] inject the host's analyses
//!
//! ## Section Model (`section`)
//! - Normalized `(lb, ub, stride)` descriptors for array sections
//! - Stride-aware ordered bounds and disjointness checks
//!
//! ## Overlap Classifier (`overlap`)
//! - Four-way classification of a pair of array references
//!
//! ## Effect Collector (`effects`)
//! - Straight-line effect gathering that fails closed
//!
//! ## Session (`session`)
//! - Arena-based caches using `bumpalo` and decision statistics
//!
//! ## Safety Prover (`prover`)
//! - The two-phase fuse/expand decision procedure

pub mod adaptor;
pub mod effects;
pub mod error;
pub mod overlap;
pub mod prover;
pub mod section;
pub mod session;

#[cfg(test)]
pub mod test_utils;

pub use adaptor::{
    AliasKind, AliasOracle, DominanceOracle, ElementalDesc, IrAdaptor, ObserverKind,
};

pub use section::{
    disjoint_sections, ordered_bounds, prove_less, LessProof, SectionDesc, Subscript,
};

pub use overlap::{classify_overlap, ComplexPart, Designator, OverlapKind};

pub use effects::{effects_between, read_or_write_effect_on, EffectInstance, EffectKind};

pub use error::{CollectError, RejectReason};

pub use session::{AnalysisSession, SessionStats};

pub use prover::{designator_indices, LoopOrdering, LoopPlan, SafetyProver, Verdict};
