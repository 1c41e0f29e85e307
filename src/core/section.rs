// This module implements the section model: the normalized (lower, upper, stride)
// description of one array subscript, the ordered-bounds computation that accounts for
// negative strides, and the three-valued less-than proof used by the disjointness test.
// A section descriptor is normalized exactly once, on construction, and the rules are
// idempotent. The less-than proof only recognizes compile-time constants and additive
// positive-constant-offset patterns; everything else is Unknown, which callers must
// never read as a proven ordering in either direction.

//! Array section descriptors and bound-ordering proofs.

use super::adaptor::IrAdaptor;

/// One subscript of a designator: a single index or a lb:ub:stride triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscript<V> {
    Index(V),
    Triplet { lb: V, ub: V, stride: V },
}

impl<V: Copy> Subscript<V> {
    pub fn is_triplet(&self) -> bool {
        matches!(self, Subscript::Triplet { .. })
    }
}

/// Normalized section descriptor.
///
/// Normalization rules, applied once on construction:
///   1. an absent upper bound is set to the lower bound;
///   2. if `lb == ub` the stride is irrelevant and reset to `None`;
///   3. a stride statically equal to 1 is reset to `None`.
///
/// Two sections are identical iff all three normalized fields are
/// structurally identical. `<x, x, s>` and a bare index `x` normalize to
/// the same descriptor: they address the same elements even though the
/// slice shapes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDesc<V> {
    pub lb: V,
    pub ub: V,
    pub stride: Option<V>,
}

impl<V: Copy + Eq> SectionDesc<V> {
    pub fn new<A>(ir: &A, lb: V, ub: Option<V>, stride: Option<V>) -> Self
    where
        A: IrAdaptor<ValueRef = V>,
    {
        let ub = ub.unwrap_or(lb);
        let mut stride = stride;
        if lb == ub {
            stride = None;
        }
        if let Some(s) = stride {
            if ir.int_constant(s) == Some(1) {
                stride = None;
            }
        }
        SectionDesc { lb, ub, stride }
    }

    pub fn from_subscript<A>(ir: &A, sub: &Subscript<V>) -> Self
    where
        A: IrAdaptor<ValueRef = V>,
    {
        match *sub {
            Subscript::Index(idx) => SectionDesc::new(ir, idx, None, None),
            Subscript::Triplet { lb, ub, stride } => {
                SectionDesc::new(ir, lb, Some(ub), Some(stride))
            }
        }
    }
}

/// Ordered `(low, high)` bounds of a section, such that `low <= high`
/// whenever the stride's sign is statically known.
///
/// An absent stride means 1, so the descriptor order is already correct. A
/// known negative constant stride reverses the bounds. An unknown stride
/// sign gives no order at all.
pub fn ordered_bounds<A: IrAdaptor>(
    ir: &A,
    desc: &SectionDesc<A::ValueRef>,
) -> Option<(A::ValueRef, A::ValueRef)> {
    match desc.stride {
        None => Some((desc.lb, desc.ub)),
        Some(stride) => match ir.int_constant(stride) {
            Some(c) if c >= 0 => Some((desc.lb, desc.ub)),
            Some(_) => Some((desc.ub, desc.lb)),
            None => None,
        },
    }
}

/// Outcome of a less-than proof between two index expressions.
///
/// `Unknown` means "not proven less", which is distinct from `Disproven`
/// ("proven not less"). Disjointness tests may act only on `Proven`;
/// collapsing `Unknown` into either boolean changes soundness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessProof {
    Proven,
    Disproven,
    Unknown,
}

/// Try to prove `v1 < v2`.
///
/// Numeric conversion wrappers are stripped from both operands first. The
/// recognized patterns, for a provably positive constant `C`:
///   - both operands are compile-time constants;
///   - `v2 = v1 + C` or `v2 = C + v1`;
///   - `v1 = v2 - C`.
pub fn prove_less<A: IrAdaptor>(ir: &A, v1: A::ValueRef, v2: A::ValueRef) -> LessProof {
    let v1 = ir.strip_converts(v1);
    let v2 = ir.strip_converts(v2);

    if let (Some(c1), Some(c2)) = (ir.int_constant(v1), ir.int_constant(v2)) {
        return if c1 < c2 {
            LessProof::Proven
        } else {
            LessProof::Disproven
        };
    }

    let positive = |v: A::ValueRef| matches!(ir.int_constant(v), Some(c) if c > 0);

    if let Some((lhs, rhs)) = ir.as_add(v2) {
        if (ir.strip_converts(lhs) == v1 && positive(rhs))
            || (ir.strip_converts(rhs) == v1 && positive(lhs))
        {
            return LessProof::Proven;
        }
    }

    if let Some((lhs, rhs)) = ir.as_sub(v1) {
        if ir.strip_converts(lhs) == v2 && positive(rhs) {
            return LessProof::Proven;
        }
    }

    LessProof::Unknown
}

/// True only if the two sections are known to be disjoint.
///
/// For example, for any positive constant C:
///   X:Y does not overlap with (Y+C):Z
///   X:Y does not overlap with Z:(X-C)
///
/// The comparison must be made on the ordered bounds, otherwise
/// `a(x:y:1) = a(z:x-1:-1) + 1` may be incorrectly treated as not
/// overlapping (x=2, y=10, z=9). Both orderings failing to prove is not a
/// disjointness proof, hence the `Proven`-only checks.
pub fn disjoint_sections<A: IrAdaptor>(
    ir: &A,
    a: &SectionDesc<A::ValueRef>,
    b: &SectionDesc<A::ValueRef>,
) -> bool {
    let (Some((lb1, ub1)), Some((lb2, ub2))) = (ordered_bounds(ir, a), ordered_bounds(ir, b))
    else {
        return false;
    };
    prove_less(ir, ub1, lb2) == LessProof::Proven || prove_less(ir, ub2, lb1) == LessProof::Proven
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::ExprIr;

    #[test]
    fn normalization_is_idempotent() {
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let y = ir.opaque();
        let one = ir.constant(1);
        let two = ir.constant(2);

        for (lb, ub, stride) in [
            (x, None, None),
            (x, Some(y), None),
            (x, Some(x), Some(two)),
            (x, Some(y), Some(one)),
            (x, Some(y), Some(two)),
        ] {
            let once = SectionDesc::new(&ir, lb, ub, stride);
            let twice = SectionDesc::new(&ir, once.lb, Some(once.ub), once.stride);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn degenerate_triplet_matches_bare_index() {
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let two = ir.constant(2);
        let index = SectionDesc::from_subscript(&ir, &Subscript::Index(x));
        let triplet =
            SectionDesc::from_subscript(&ir, &Subscript::Triplet { lb: x, ub: x, stride: two });
        assert_eq!(index, triplet);
    }

    #[test]
    fn negative_stride_reverses_ordered_bounds() {
        let mut ir = ExprIr::new();
        let lo = ir.opaque();
        let hi = ir.opaque();
        let minus_one = ir.constant(-1);
        let desc = SectionDesc::new(&ir, hi, Some(lo), Some(minus_one));
        assert_eq!(ordered_bounds(&ir, &desc), Some((lo, hi)));
    }

    #[test]
    fn unknown_stride_sign_gives_no_order() {
        let mut ir = ExprIr::new();
        let lo = ir.opaque();
        let hi = ir.opaque();
        let s = ir.opaque();
        let desc = SectionDesc::new(&ir, lo, Some(hi), Some(s));
        assert_eq!(ordered_bounds(&ir, &desc), None);
    }

    #[test]
    fn prove_less_on_constants() {
        let mut ir = ExprIr::new();
        let c2 = ir.constant(2);
        let c5 = ir.constant(5);
        assert_eq!(prove_less(&ir, c2, c5), LessProof::Proven);
        assert_eq!(prove_less(&ir, c5, c2), LessProof::Disproven);
        assert_eq!(prove_less(&ir, c2, c2), LessProof::Disproven);
    }

    #[test]
    fn prove_less_on_constant_offsets() {
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let c3 = ir.constant(3);
        let x_plus_3 = ir.add(x, c3);
        let three_plus_x = ir.add(c3, x);
        let x_minus_3 = ir.sub(x, c3);
        assert_eq!(prove_less(&ir, x, x_plus_3), LessProof::Proven);
        assert_eq!(prove_less(&ir, x, three_plus_x), LessProof::Proven);
        assert_eq!(prove_less(&ir, x_minus_3, x), LessProof::Proven);
        // No disproof for offset patterns, only Unknown the other way.
        assert_eq!(prove_less(&ir, x_plus_3, x), LessProof::Unknown);
    }

    #[test]
    fn prove_less_strips_converts() {
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let c1 = ir.constant(1);
        let wrapped = ir.convert(x);
        let sum = ir.add(wrapped, c1);
        let wrapped_sum = ir.convert(sum);
        assert_eq!(prove_less(&ir, x, wrapped_sum), LessProof::Proven);
    }

    #[test]
    fn prove_less_gives_up_on_opaque_operands() {
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let y = ir.opaque();
        assert_eq!(prove_less(&ir, x, y), LessProof::Unknown);
    }

    #[test]
    fn adjacent_constant_sections_are_disjoint() {
        let mut ir = ExprIr::new();
        let c2 = ir.constant(2);
        let c10 = ir.constant(10);
        let c11 = ir.constant(11);
        let c20 = ir.constant(20);
        let a = SectionDesc::new(&ir, c2, Some(c10), None);
        let b = SectionDesc::new(&ir, c11, Some(c20), None);
        assert!(disjoint_sections(&ir, &a, &b));
        assert!(disjoint_sections(&ir, &b, &a));
    }

    #[test]
    fn reversed_sections_are_not_misread_as_disjoint() {
        // a(2:10:1) vs a(9:1:-1): raw bound comparison would prove 10 < 9
        // false and 1 < 2 true, wrongly splitting them. Ordered bounds make
        // the second section 1:9, which overlaps.
        let mut ir = ExprIr::new();
        let c1 = ir.constant(1);
        let c2 = ir.constant(2);
        let c9 = ir.constant(9);
        let c10 = ir.constant(10);
        let minus_one = ir.constant(-1);
        let forward = SectionDesc::new(&ir, c2, Some(c10), Some(c1));
        let backward = SectionDesc::new(&ir, c9, Some(c1), Some(minus_one));
        assert!(!disjoint_sections(&ir, &forward, &backward));
    }

    #[test]
    fn reversed_section_above_a_symbolic_bound() {
        // X:Y forward vs (Y+1):Z backward: ordered bounds expose Y < Y+1.
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let y = ir.opaque();
        let z = ir.opaque();
        let c1 = ir.constant(1);
        let minus_one = ir.constant(-1);
        let y_plus_1 = ir.add(y, c1);
        let forward = SectionDesc::new(&ir, x, Some(y), Some(c1));
        let backward = SectionDesc::new(&ir, z, Some(y_plus_1), Some(minus_one));
        assert!(disjoint_sections(&ir, &forward, &backward));
    }

    #[test]
    fn unprovable_order_is_not_disjoint() {
        let mut ir = ExprIr::new();
        let x = ir.opaque();
        let y = ir.opaque();
        let a = SectionDesc::new(&ir, x, Some(x), None);
        let b = SectionDesc::new(&ir, y, Some(y), None);
        assert!(!disjoint_sections(&ir, &a, &b));
    }
}
