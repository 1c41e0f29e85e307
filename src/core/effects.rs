// This module implements the effect collector: given two program points in the same
// block with the start properly dominating the end, it produces the ordered list of
// abstract read/write effects performed by every operation in [start, end), recursing
// into nested regions through the adaptor's per-operation effect listing. Collection
// fails closed: one operation whose effects cannot be enumerated poisons the whole
// span, and there are no partial results. The module also hosts the helper that
// relates one effect instance to a given value through the alias oracle, including
// the designator fallback for the common load-through-designator pattern the oracle
// cannot see through.

//! Abstract memory effects and straight-line effect collection.

use bumpalo::collections::Vec as ArenaVec;

use super::adaptor::{AliasKind, AliasOracle, DominanceOracle, IrAdaptor};
use super::error::CollectError;
use super::session::AnalysisSession;

/// Kind of an abstract memory effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Read,
    Write,
}

/// One read or write performed by an operation.
///
/// A `location` of `None` means the effect touches an unknown or unmodeled
/// resource; safety proofs must treat it as potentially anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectInstance<V> {
    pub kind: EffectKind,
    pub location: Option<V>,
}

impl<V> EffectInstance<V> {
    pub fn read(location: V) -> Self {
        EffectInstance { kind: EffectKind::Read, location: Some(location) }
    }

    pub fn write(location: V) -> Self {
        EffectInstance { kind: EffectKind::Write, location: Some(location) }
    }
}

/// Collect all effects of the operations in `[start, end)`.
///
/// `start` and `end` must be in the same block with `start` properly
/// dominating `end`; violations are reported as
/// [`CollectError::NotStraightLine`] rather than asserted. Nested region
/// effects are included via [`IrAdaptor::op_effects`]. Any operation with
/// unenumerable effects fails the whole collection.
pub fn effects_between<'arena, A, D>(
    ir: &A,
    dom: &D,
    session: &AnalysisSession<'arena, A>,
    start: A::OpRef,
    end: A::OpRef,
) -> Result<ArenaVec<'arena, EffectInstance<A::ValueRef>>, CollectError>
where
    A: IrAdaptor,
    D: DominanceOracle<A::OpRef>,
{
    let mut out = ArenaVec::new_in(session.arena());
    if start == end {
        return Ok(out);
    }
    if !ir.same_block(start, end) || !dom.properly_dominates(start, end) {
        return Err(CollectError::NotStraightLine);
    }

    let mut op = start;
    loop {
        if op == end {
            break;
        }
        let effects = ir.op_effects(op).ok_or(CollectError::Unanalyzable)?;
        out.extend(effects);
        match ir.next_op(op) {
            Some(next) => op = next,
            // Dominance said `end` is ahead of us, so running off the block
            // means the oracle and the walker disagree.
            None => return Err(CollectError::NotStraightLine),
        }
    }
    Ok(out)
}

/// How `effect` relates to the memory behind `val`.
///
/// Identity and the designator pattern are resolved here because alias
/// oracles typically cannot see through a designator to its base:
///   %ref = designate %array(%index)
///   %val = load %ref
/// An effect with no locatable value answers `May`.
pub fn read_or_write_effect_on<A, O>(
    ir: &A,
    oracle: &O,
    effect: &EffectInstance<A::ValueRef>,
    val: A::ValueRef,
) -> AliasKind
where
    A: IrAdaptor,
    O: AliasOracle<A::ValueRef>,
{
    let Some(location) = effect.location else {
        return AliasKind::May;
    };
    if location == val {
        return AliasKind::Must;
    }

    let res = oracle.alias(val, location);
    if !res.is_no() {
        return res;
    }

    if let Some(designator) = ir.designator(location) {
        if designator.base == val {
            return AliasKind::Must;
        }
        let res = oracle.alias(val, designator.base);
        if !res.is_no() {
            return res;
        }
    }

    AliasKind::No
}
