// This module defines the IrAdaptor trait, which serves as the bridge between the
// bufferization safety analysis and any SSA-based intermediate representation (IR).
// The trait provides a minimal interface for the analysis to query IR structure:
// straight-line instruction order, per-operation memory effects (recursing into nested
// regions), scalar expression patterns needed by the bound-ordering proofs, designator
// decomposition, and the accessors of an elemental (per-element, lazily evaluated)
// computation. The two oracles the analysis consumes but never implements - aliasing
// and dominance - are separate traits so hosts can inject whatever precision they have.
// This abstraction allows the decision procedure to work with different IRs without
// depending on their specific implementation details.

//! IrAdaptor responsibilities.
//!
//! The adaptor is the glue between the analysis core and the host IR. It
//! exposes the IR structure through a trait in Rust rather than binding the
//! analysis to one compiler's node types. The framework assumes:
//! - Straight-line spans: scanned operations live in one block, in order.
//! - Operations may carry nested regions (the elemental body is one).
//! - Values are immutable SSA-style references with structural identity.
//!
//! The oracles are deliberately not part of [`IrAdaptor`]: aliasing and
//! dominance are capabilities the host supplies, with whatever precision it
//! has. A host with no alias information can answer [`AliasKind::May`]
//! everywhere and the analysis stays sound, just less effective.

use std::fmt::Debug;
use std::hash::Hash;

use super::effects::EffectInstance;
use super::overlap::Designator;

/// Result of an alias query between two values.
///
/// `Partial` means the locations provably overlap but not element-for-element;
/// `Must` means they cover the same element set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    No,
    May,
    Partial,
    Must,
}

impl AliasKind {
    pub fn is_no(self) -> bool {
        self == AliasKind::No
    }

    pub fn is_partial(self) -> bool {
        self == AliasKind::Partial
    }
}

/// Alias oracle supplied by the host; never implemented by the analysis core.
pub trait AliasOracle<V> {
    fn alias(&self, a: V, b: V) -> AliasKind;
}

/// Dominance oracle supplied by the host.
pub trait DominanceOracle<O> {
    /// True if `a` comes strictly before `b` and every path to `b` passes
    /// through `a`. For straight-line spans this is plain program order.
    fn properly_dominates(&self, a: O, b: O) -> bool;
}

/// How an operation observes an elemental value.
///
/// The set of observer kinds relevant to the analysis is closed, so this is
/// a tagged variant rather than open-ended dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverKind<V> {
    /// An assignment consuming the elemental as its right-hand side.
    Assign {
        lhs: V,
        rhs: V,
        /// Whether the assignment may (re)allocate the left-hand side.
        is_realloc: bool,
    },
    /// The destroy of the elemental temporary.
    Destroy {
        /// Whether destruction must run finalization.
        must_finalize: bool,
    },
    Other,
}

/// Decomposed view of an elemental computation.
#[derive(Debug, Clone)]
pub struct ElementalDesc<V, O> {
    /// Value describing the extents of the produced array.
    pub shape: V,
    /// Induction indices of the per-element body, in declaration order.
    pub indices: Vec<V>,
    /// First operation of the body region (the yield when the body is empty).
    pub body_first: O,
    /// The result-yielding terminator of the body region.
    pub yield_op: O,
    /// Value yielded for each element.
    pub yielded: V,
    /// Whether the element order is semantically observable.
    pub is_ordered: bool,
    /// Whether a materialized temporary is required for external reasons
    /// (e.g. finalization obligations).
    pub must_produce_temp: bool,
}

/// Bridge between an SSA IR and the bufferization analysis.
///
/// The [`IrAdaptor`] trait provides the hooks the decision procedure needs
/// to read an arbitrary IR. The adaptor is responsible for walking
/// operations in block order, enumerating per-operation memory effects, and
/// decomposing values into designators and scalar expression patterns. The
/// analysis itself never mutates the IR; commit happens in the caller.
pub trait IrAdaptor {
    type ValueRef: Copy + Eq + Hash + Debug;
    type OpRef: Copy + Eq + Debug;
    type TypeRef: Copy + Eq + Debug;

    // ---- straight-line structure ----

    /// Next operation after `op` in its block, `None` at the block end.
    fn next_op(&self, op: Self::OpRef) -> Option<Self::OpRef>;

    /// Whether two operations belong to the same block.
    fn same_block(&self, a: Self::OpRef, b: Self::OpRef) -> bool;

    /// The value produced by `op`, if any.
    fn op_result(&self, op: Self::OpRef) -> Option<Self::ValueRef>;

    /// Operations using `val` as an operand, nested regions included.
    fn users(&self, val: Self::ValueRef) -> Box<dyn Iterator<Item = Self::OpRef> + '_>;

    // ---- memory effects ----

    /// Memory effects of `op`, recursing into nested regions. `None` means
    /// the effects cannot be enumerated; a nested unmodeled effect makes the
    /// whole operation unanalyzable.
    fn op_effects(&self, op: Self::OpRef) -> Option<Vec<EffectInstance<Self::ValueRef>>>;

    // ---- scalar expression queries ----

    /// The compile-time integer value of `val`, if it is a constant.
    fn int_constant(&self, val: Self::ValueRef) -> Option<i64>;

    /// Strip numeric type-conversion wrappers.
    fn strip_converts(&self, val: Self::ValueRef) -> Self::ValueRef;

    /// Decompose `val` as an integer addition.
    fn as_add(&self, val: Self::ValueRef) -> Option<(Self::ValueRef, Self::ValueRef)>;

    /// Decompose `val` as an integer subtraction.
    fn as_sub(&self, val: Self::ValueRef) -> Option<(Self::ValueRef, Self::ValueRef)>;

    /// If `val` is a dimension lower-bound query, return the queried array
    /// and the zero-based dimension.
    fn dim_lower_bound(&self, val: Self::ValueRef) -> Option<(Self::ValueRef, usize)>;

    // ---- designators ----

    /// Decompose `val` as an array designator, when it was built by slicing.
    fn designator(&self, val: Self::ValueRef) -> Option<Designator<Self::ValueRef>>;

    // ---- typing ----

    /// Whether `val` refers to storage of array shape.
    fn is_array(&self, val: Self::ValueRef) -> bool;

    /// Element type of an array value, or the scalar's own type.
    fn element_type(&self, val: Self::ValueRef) -> Option<Self::TypeRef>;

    /// Whether a type is trivial: no user-defined assignment, no
    /// side-effect-bearing construction or destruction.
    fn is_trivial_type(&self, ty: Self::TypeRef) -> bool;

    // ---- elemental computations ----

    /// Decompose `op` as an elemental computation.
    fn as_elemental(&self, op: Self::OpRef) -> Option<ElementalDesc<Self::ValueRef, Self::OpRef>>;

    /// Classify how `op` observes an elemental value it uses.
    fn classify_observer(&self, op: Self::OpRef) -> ObserverKind<Self::ValueRef>;
}
