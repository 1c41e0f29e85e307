// This module implements the safety prover that decides whether an elemental
// (per-element, lazily evaluated) array computation can be fused into a loop nest that
// writes the assignment target in place, instead of materializing a temporary buffer
// and assigning it afterwards. It should match code of the form
//
//   %expr = elemental %shape (%i) {
//     %0 = designate %array [%i]
//     [...]                        ; no other reads or writes to %array
//     yield %element
//   }
//   assign %expr to %array
//   destroy %expr
//
// We must check that there are no reads from the array at indexes which might conflict
// with the assignment, nor any writes to it. For now we keep that strict and say that
// all reads must be at the elemental index (it is probably safe to read from higher
// indices if lowering to an ordered loop). The prover also handles the simpler
// broadcast form: assigning a trivial scalar to an array needs no overlap proof at all.
// Every rejection returns a RejectReason; the prover never mutates the IR and never
// panics - commit is the caller's job, driven by the returned LoopPlan.

//! The in-place fusion decision procedure.

use log::debug;

use super::adaptor::{AliasOracle, DominanceOracle, ElementalDesc, IrAdaptor, ObserverKind};
use super::effects::{effects_between, read_or_write_effect_on, EffectKind};
use super::error::RejectReason;
use super::overlap::{classify_overlap, Designator, OverlapKind};
use super::section::Subscript;
use super::session::AnalysisSession;

/// Iteration order the fused loop must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOrdering {
    /// No ordering dependence remains; iterations may run in any order.
    Unordered,
    /// Iterate in the declared element order.
    ElementOrder,
}

/// Everything the caller needs to emit the fused loop and retire the
/// original constructs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopPlan<V, O, T> {
    /// Fuse an elemental computation into a loop storing through the target.
    Fusion {
        elemental: O,
        assign: O,
        destroy: O,
        target: V,
        /// Extents source for the loop nest.
        shape: V,
        element_type: T,
        ordering: LoopOrdering,
    },
    /// Expand a scalar-to-array assignment into an element loop.
    Broadcast {
        assign: O,
        scalar: V,
        target: V,
        element_type: T,
    },
}

/// Outcome of one candidate analysis. Never an exception: rejection is a
/// normal result meaning "keep the buffered temporary."
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<V, O, T> {
    Accept(LoopPlan<V, O, T>),
    Reject(RejectReason),
}

impl<V, O, T> Verdict<V, O, T> {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept(_))
    }
}

pub type LoopPlanFor<A> =
    LoopPlan<<A as IrAdaptor>::ValueRef, <A as IrAdaptor>::OpRef, <A as IrAdaptor>::TypeRef>;
pub type VerdictFor<A> =
    Verdict<<A as IrAdaptor>::ValueRef, <A as IrAdaptor>::OpRef, <A as IrAdaptor>::TypeRef>;

/// Transient record of an identified candidate: the array written by the
/// assignment plus the two observers. Lives only for one decision call.
#[derive(Debug, Clone, Copy)]
struct MatchCandidate<V, O> {
    array: V,
    assign: O,
    destroy: O,
}

/// Decision procedure over one IR, one alias oracle and one dominance
/// oracle. Performs no IR mutation; the commit step belongs to the caller.
pub struct SafetyProver<'a, 'arena, A, AO, DO>
where
    A: IrAdaptor,
    AO: AliasOracle<A::ValueRef>,
    DO: DominanceOracle<A::OpRef>,
{
    ir: &'a A,
    alias: &'a AO,
    dom: &'a DO,
    session: &'a AnalysisSession<'arena, A>,
}

impl<'a, 'arena, A, AO, DO> SafetyProver<'a, 'arena, A, AO, DO>
where
    A: IrAdaptor,
    AO: AliasOracle<A::ValueRef>,
    DO: DominanceOracle<A::OpRef>,
{
    pub fn new(
        ir: &'a A,
        alias: &'a AO,
        dom: &'a DO,
        session: &'a AnalysisSession<'arena, A>,
    ) -> Self {
        Self { ir, alias, dom, session }
    }

    /// Decide whether `elemental` may be fused into an in-place loop.
    pub fn prove_elemental(&self, elemental: A::OpRef) -> VerdictFor<A> {
        self.session.record_candidate();
        match self.try_fuse_elemental(elemental) {
            Ok(plan) => {
                self.session.record_accept();
                Verdict::Accept(plan)
            }
            Err(reason) => {
                debug!("elemental at {:?} not fused: {}", elemental, reason);
                self.session.record_reject(&reason);
                Verdict::Reject(reason)
            }
        }
    }

    /// Decide whether a scalar-to-array assignment may be expanded into an
    /// element loop. The scalar case needs no overlap proof: in a
    /// conforming program the target is allocated and the assignment
    /// cannot reallocate it, so the realloc flag is ignored.
    pub fn prove_broadcast(&self, assign: A::OpRef) -> VerdictFor<A> {
        self.session.record_candidate();
        match self.try_expand_broadcast(assign) {
            Ok(plan) => {
                self.session.record_accept();
                Verdict::Accept(plan)
            }
            Err(reason) => {
                debug!("assign at {:?} not expanded: {}", assign, reason);
                self.session.record_reject(&reason);
                Verdict::Reject(reason)
            }
        }
    }

    fn try_fuse_elemental(
        &self,
        elemental: A::OpRef,
    ) -> Result<LoopPlanFor<A>, RejectReason> {
        let Some(desc) = self.ir.as_elemental(elemental) else {
            return Err(RejectReason::StructuralMismatch(
                "not an elemental computation".to_string(),
            ));
        };

        let candidate = self.find_match(elemental, &desc)?;
        self.check_body_effects(&candidate, &desc, elemental)?;

        Ok(LoopPlan::Fusion {
            elemental,
            assign: candidate.assign,
            destroy: candidate.destroy,
            target: candidate.array,
            shape: desc.shape,
            // Checked in find_match.
            element_type: self.ir.element_type(candidate.array).ok_or_else(|| {
                RejectReason::StructuralMismatch("target has no element type".to_string())
            })?,
            ordering: if desc.is_ordered {
                LoopOrdering::ElementOrder
            } else {
                LoopOrdering::Unordered
            },
        })
    }

    /// Structural preconditions: exactly two observers (one assign, one
    /// destroy), no finalization obligation, array target with a trivial
    /// element type, no potentially reallocating assignment.
    fn find_match(
        &self,
        elemental: A::OpRef,
        desc: &ElementalDesc<A::ValueRef, A::OpRef>,
    ) -> Result<MatchCandidate<A::ValueRef, A::OpRef>, RejectReason> {
        let Some(result) = self.ir.op_result(elemental) else {
            return Err(RejectReason::StructuralMismatch(
                "elemental produces no value".to_string(),
            ));
        };

        // The only uses of the elemental may be the assignment and the
        // destroy.
        let users: Vec<_> = self.ir.users(result).collect();
        if users.len() != 2 {
            return Err(RejectReason::UsageCountHazard(format!(
                "expected exactly 2 uses of the elemental, found {}",
                users.len()
            )));
        }

        if desc.must_produce_temp {
            return Err(RejectReason::FinalizationHazard(
                "elemental must produce a temporary".to_string(),
            ));
        }

        let mut assign = None;
        let mut destroy = None;
        for &user in &users {
            match self.ir.classify_observer(user) {
                ObserverKind::Assign { lhs, rhs, is_realloc } if rhs == result => {
                    assign = Some((user, lhs, is_realloc));
                }
                ObserverKind::Destroy { must_finalize } => {
                    destroy = Some((user, must_finalize));
                }
                _ => {}
            }
        }
        let Some((assign_op, array, is_realloc)) = assign else {
            return Err(RejectReason::UsageCountHazard(
                "the elemental has no assignment observer".to_string(),
            ));
        };
        let Some((destroy_op, must_finalize)) = destroy else {
            return Err(RejectReason::UsageCountHazard(
                "the elemental has no destroy observer".to_string(),
            ));
        };

        if must_finalize {
            return Err(RejectReason::FinalizationHazard(
                "destroying the temporary requires finalization".to_string(),
            ));
        }

        if !self.ir.is_array(array) {
            return Err(RejectReason::StructuralMismatch(
                "assignment target is not an array".to_string(),
            ));
        }
        match self.ir.element_type(array) {
            Some(ty) if self.ir.is_trivial_type(ty) => {}
            _ => {
                return Err(RejectReason::StructuralMismatch(
                    "target element type is not trivial".to_string(),
                ));
            }
        }

        // The target must already conform to the elemental's shape. A
        // reallocating assignment can change the target's extents, which
        // would invalidate the fused loop bounds.
        if is_realloc {
            return Err(RejectReason::ShapeOrAllocationHazard(
                "assignment may (re)allocate the target".to_string(),
            ));
        }

        Ok(MatchCandidate { array, assign: assign_op, destroy: destroy_op })
    }

    /// The two-phase effect analysis: the elemental body first, then the
    /// span between the elemental and the assignment.
    fn check_body_effects(
        &self,
        candidate: &MatchCandidate<A::ValueRef, A::OpRef>,
        desc: &ElementalDesc<A::ValueRef, A::OpRef>,
        elemental: A::OpRef,
    ) -> Result<(), RejectReason> {
        let array = candidate.array;

        // Values written inside the elemental cannot be read or written
        // between the elemental and the assignment, because the writes move
        // to the assignment point with the loop.
        let mut write_obligations =
            bumpalo::collections::Vec::new_in(self.session.arena());
        // Likewise, values read inside the elemental cannot be written to
        // in that span.
        let mut read_obligations =
            bumpalo::collections::Vec::new_in(self.session.arena());

        // Phase 1: effects inside the elemental body. Looking only for
        // ordered elementals would not be enough - out of order reads are
        // just as unsafe.
        let effects =
            effects_between(self.ir, self.dom, self.session, desc.body_first, desc.yield_op)
                .map_err(RejectReason::from)?;
        for effect in effects.iter() {
            let res = read_or_write_effect_on(self.ir, self.alias, effect, array);
            if res.is_no() {
                if let Some(location) = effect.location {
                    match effect.kind {
                        EffectKind::Write => write_obligations.push(location),
                        EffectKind::Read => read_obligations.push(location),
                    }
                }
                continue;
            }

            // No write aliasing the target is ever allowed in the body.
            if effect.kind == EffectKind::Write {
                return Err(RejectReason::AliasingHazard(
                    "write aliasing the assignment target inside the elemental body"
                        .to_string(),
                ));
            }

            let Some(location) = effect.location else {
                return Err(RejectReason::UnanalyzableEffect(
                    "aliasing side effect with no locatable value".to_string(),
                ));
            };

            // A partial alias means the read covers some but not all of the
            // target's elements; the element indices are incomparable, so
            // only a disjointness proof can save the candidate.
            if res.is_partial() {
                match classify_overlap(self.ir, self.session, array, location) {
                    OverlapKind::DefinitelyDisjoint => continue,
                    _ => {
                        return Err(RejectReason::AliasingHazard(
                            "partially aliasing read cannot be proven disjoint".to_string(),
                        ));
                    }
                }
            }

            // May or must alias: reads are allowed if and only if they are
            // from the elemental indices, in order - then no iteration reads
            // values written by another iteration. Proven-disjoint slices of
            // the same base are also fine.
            if let Some(designator) = self.session.designator(self.ir, location) {
                match classify_overlap(self.ir, self.session, array, designator.base) {
                    OverlapKind::DefinitelyDisjoint => continue,
                    OverlapKind::Unknown => {
                        return Err(RejectReason::AliasingHazard(
                            "read with unknown overlap against the target".to_string(),
                        ));
                    }
                    _ => {
                        if designator_indices(self.ir, &designator)
                            .is_some_and(|indices| indices == desc.indices)
                        {
                            continue;
                        }
                        return Err(RejectReason::AliasingHazard(
                            "read at indices other than the elemental's own".to_string(),
                        ));
                    }
                }
            }
            return Err(RejectReason::AliasingHazard(
                "aliasing read from an undecomposable location".to_string(),
            ));
        }

        // Phase 2: effects between the elemental and the assignment.
        let Some(after_elemental) = self.ir.next_op(elemental) else {
            return Err(RejectReason::StructuralMismatch(
                "assignment is not in the elemental's block".to_string(),
            ));
        };
        let effects =
            effects_between(self.ir, self.dom, self.session, after_elemental, candidate.assign)
                .map_err(RejectReason::from)?;
        for effect in effects.iter() {
            for &written in write_obligations.iter() {
                if !read_or_write_effect_on(self.ir, self.alias, effect, written).is_no() {
                    return Err(RejectReason::AliasingHazard(
                        "value written in the elemental is touched before the assignment"
                            .to_string(),
                    ));
                }
            }
            for &read in read_obligations.iter() {
                if effect.kind != EffectKind::Read
                    && !read_or_write_effect_on(self.ir, self.alias, effect, read).is_no()
                {
                    return Err(RejectReason::AliasingHazard(
                        "value read in the elemental is written before the assignment"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    fn try_expand_broadcast(
        &self,
        assign: A::OpRef,
    ) -> Result<LoopPlanFor<A>, RejectReason> {
        let ObserverKind::Assign { lhs, rhs, is_realloc: _ } =
            self.ir.classify_observer(assign)
        else {
            return Err(RejectReason::StructuralMismatch(
                "not an assignment".to_string(),
            ));
        };

        if self.ir.is_array(rhs) {
            return Err(RejectReason::StructuralMismatch(
                "right-hand side is not a scalar".to_string(),
            ));
        }
        match self.ir.element_type(rhs) {
            Some(ty) if self.ir.is_trivial_type(ty) => {}
            _ => {
                return Err(RejectReason::StructuralMismatch(
                    "right-hand side is not a trivial scalar".to_string(),
                ));
            }
        }

        if !self.ir.is_array(lhs) {
            return Err(RejectReason::StructuralMismatch(
                "assignment target is not an array".to_string(),
            ));
        }
        let element_type = match self.ir.element_type(lhs) {
            Some(ty) if self.ir.is_trivial_type(ty) => ty,
            _ => {
                return Err(RejectReason::StructuralMismatch(
                    "target element type is not trivial".to_string(),
                ));
            }
        };

        Ok(LoopPlan::Broadcast { assign, scalar: rhs, target: lhs, element_type })
    }
}

/// The subscripts of `designator` as a plain index list, with indices
/// adjusted to a dynamic lower bound folded back to their one-based form.
///
/// The recognized adjustment, per dimension:
///   %lb  = <lower bound of base in dim>
///   %off = sub %lb, 1
///   %idx = add %one_based, %off
///
/// If any dimension deviates from the pattern the raw indices are returned;
/// a designator with section subscripts has no index list at all.
pub fn designator_indices<A: IrAdaptor>(
    ir: &A,
    designator: &Designator<A::ValueRef>,
) -> Option<Vec<A::ValueRef>> {
    let mut raw = Vec::with_capacity(designator.subscripts.len());
    for sub in &designator.subscripts {
        match *sub {
            Subscript::Index(idx) => raw.push(idx),
            Subscript::Triplet { .. } => return None,
        }
    }

    let mut recovered = Vec::with_capacity(raw.len());
    for (dim, &idx) in raw.iter().enumerate() {
        let Some((lhs, rhs)) = ir.as_add(idx) else { break };
        if is_lower_bound_offset(ir, rhs, designator.base, dim) {
            recovered.push(lhs);
        } else if is_lower_bound_offset(ir, lhs, designator.base, dim) {
            recovered.push(rhs);
        } else {
            break;
        }
    }
    if recovered.len() == raw.len() {
        Some(recovered)
    } else {
        Some(raw)
    }
}

/// True if `val` is `<lower bound of base in dim> - 1`.
fn is_lower_bound_offset<A: IrAdaptor>(
    ir: &A,
    val: A::ValueRef,
    base: A::ValueRef,
    dim: usize,
) -> bool {
    let Some((lhs, rhs)) = ir.as_sub(val) else {
        return false;
    };
    if ir.int_constant(rhs) != Some(1) {
        return false;
    }
    matches!(ir.dim_lower_bound(lhs), Some((b, d)) if b == base && d == dim)
}
