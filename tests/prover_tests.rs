//! End-to-end tests of the safety prover over the textual test IR:
//! acceptance of fusable elementals, the full rejection taxonomy, and the
//! broadcast assignment path.

use bumpalo::Bump;

use bufopt::core::{
    AnalysisSession, LoopOrdering, LoopPlan, RejectReason, SafetyProver, Verdict,
};
use bufopt::test_ir::{OpKind, TestAliasOracle, TestDominance, TestIR, TestIRAdaptor};

type TestVerdict = Verdict<u32, u32, bufopt::test_ir::TypeKind>;

fn value(ir: &TestIR, name: &str) -> u32 {
    ir.ops
        .iter()
        .position(|op| op.name == name)
        .map(|idx| idx as u32)
        .unwrap_or_else(|| panic!("no value named %{name}"))
}

fn prove_elemental(text: &str, name: &str) -> TestVerdict {
    let ir = TestIR::parse(text).unwrap();
    let adaptor = TestIRAdaptor::new(&ir);
    let oracle = TestAliasOracle::new(&ir);
    let dom = TestDominance::new(&ir);
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let prover = SafetyProver::new(&adaptor, &oracle, &dom, &session);
    prover.prove_elemental(value(&ir, name))
}

fn prove_broadcast(text: &str) -> TestVerdict {
    let ir = TestIR::parse(text).unwrap();
    let assign = ir
        .ops
        .iter()
        .position(|op| matches!(op.kind, OpKind::Assign { .. }))
        .map(|idx| idx as u32)
        .expect("no assign op");
    let adaptor = TestIRAdaptor::new(&ir);
    let oracle = TestAliasOracle::new(&ir);
    let dom = TestDominance::new(&ir);
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let prover = SafetyProver::new(&adaptor, &oracle, &dom, &session);
    prover.prove_broadcast(assign)
}

fn assert_reject(verdict: &TestVerdict, check: fn(&RejectReason) -> bool) {
    match verdict {
        Verdict::Reject(reason) => assert!(check(reason), "unexpected reason: {reason}"),
        Verdict::Accept(_) => panic!("expected rejection, got acceptance"),
    }
}

#[test]
fn accepts_read_at_own_index() {
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                %r = add %v, %c1
                yield %r
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    let Verdict::Accept(LoopPlan::Fusion { ordering, .. }) = verdict else {
        panic!("expected fusion acceptance, got {verdict:?}");
    };
    assert_eq!(ordering, LoopOrdering::Unordered);
}

#[test]
fn ordered_elemental_keeps_element_order() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp ordered (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    let Verdict::Accept(LoopPlan::Fusion { ordering, .. }) = verdict else {
        panic!("expected fusion acceptance, got {verdict:?}");
    };
    assert_eq!(ordering, LoopOrdering::ElementOrder);
}

#[test]
fn accepts_one_based_index_recovery() {
    // The body reads a(i + (lbound(a,0) - 1)), the adjusted form of a(i)
    // for an array with a dynamic lower bound.
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %lb = lbound %a, 0
                %off = sub %lb, %c1
                %adj = add %i, %off
                %d = designate %a [%adj]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert!(verdict.is_accept(), "got {verdict:?}");
}

#[test]
fn accepts_read_from_unrelated_array() {
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            %e = elemental %shp (%i) {
                %j = add %i, %c1
                %d = designate %b [%j]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert!(verdict.is_accept(), "got {verdict:?}");
}

#[test]
fn rejects_write_aliasing_the_target() {
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                store %v, %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::AliasingHazard(_)));
}

#[test]
fn rejects_read_at_foreign_index() {
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %j = add %i, %c1
                %d = designate %a [%j]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::AliasingHazard(_)));
}

#[test]
fn accepts_read_from_disjoint_section_of_the_target() {
    // The assignment writes a(1:10) while the body reads a(11:20).
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c10 = const 10
            %c11 = const 11
            %c20 = const 20
            %shp = shape %c10
            %big = shape %c20
            %a = array %big : i64
            %dst = designate %a [%c1:%c10:%c1]
            %e = elemental %shp (%i) {
                %src = designate %a [%c11:%c20:%c1]
                %d = designate %src [%i]
                %v = load %d
                yield %v
            }
            assign %e to %dst
            destroy %e
        }
        "#,
        "e",
    );
    // The read location's own base resolves to %src; the classifier then
    // compares %dst against %src.
    assert!(verdict.is_accept(), "got {verdict:?}");
}

#[test]
fn rejects_unanalyzable_effect_in_body() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                %x = call @opaque(%v)
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::UnanalyzableEffect(_)));
}

#[test]
fn rejects_unanalyzable_effect_between_elemental_and_assign() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            %x = call @opaque(%a)
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::UnanalyzableEffect(_)));
}

#[test]
fn pure_calls_are_harmless() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                %x = call pure @benign(%v)
                yield %x
            }
            %y = call pure @benign(%a)
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert!(verdict.is_accept(), "got {verdict:?}");
}

#[test]
fn rejects_extra_observer() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            %x = call pure @peek(%e)
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::UsageCountHazard(_)));
}

#[test]
fn rejects_missing_destroy() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::UsageCountHazard(_)));
}

#[test]
fn rejects_reallocating_assignment() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a realloc
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| {
        matches!(r, RejectReason::ShapeOrAllocationHazard(_))
    });
}

#[test]
fn rejects_finalizing_destroy() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e finalize
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::FinalizationHazard(_)));
}

#[test]
fn rejects_elemental_that_must_produce_a_temporary() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp temp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::FinalizationHazard(_)));
}

#[test]
fn rejects_non_trivial_element_type() {
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : derived
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::StructuralMismatch(_)));
}

#[test]
fn rejects_declared_aliasing_read() {
    // %b may alias %a per declaration; the read cannot be placed relative
    // to the assignment target.
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            mayalias %a, %b
            %e = elemental %shp (%i) {
                %d = designate %b [%i]
                %v = load %d
                yield %v
            }
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::AliasingHazard(_)));
}

#[test]
fn rejects_write_between_elemental_and_assign_to_a_read_value() {
    // The body reads %b; a store to %b before the assignment would change
    // what the fused loop reads.
    let verdict = prove_elemental(
        r#"
        main {
            %c0 = const 0
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %b [%i]
                %v = load %d
                yield %v
            }
            %w = designate %b [%c1]
            store %c0, %w
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::AliasingHazard(_)));
}

#[test]
fn reads_between_elemental_and_assign_are_harmless() {
    let verdict = prove_elemental(
        r#"
        main {
            %c1 = const 1
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %b [%i]
                %v = load %d
                yield %v
            }
            %w = designate %b [%c1]
            %r = load %w
            assign %e to %a
            destroy %e
        }
        "#,
        "e",
    );
    assert!(verdict.is_accept(), "got {verdict:?}");
}

#[test]
fn sees_effects_nested_inside_an_intervening_region() {
    // The first elemental writes %b, so nothing may touch %b before its
    // assignment. The second elemental reads %b inside its body; that read
    // must count even though it is nested in another region.
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            %e1 = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                %db = designate %b [%i]
                store %v, %db
                yield %v
            }
            %e2 = elemental %shp (%j) {
                %db2 = designate %b [%j]
                %w = load %db2
                yield %w
            }
            assign %e1 to %a
            destroy %e1
            assign %e2 to %b
            destroy %e2
        }
        "#,
        "e1",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::AliasingHazard(_)));
}

#[test]
fn rejects_assignment_into_the_expression_itself() {
    // An elemental result is not storage; assigning it to itself cannot be
    // fused into anything.
    let verdict = prove_elemental(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %e
            destroy %e
        }
        "#,
        "e",
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::StructuralMismatch(_)));
}

#[test]
fn broadcast_of_trivial_scalar_is_accepted() {
    let verdict = prove_broadcast(
        r#"
        main {
            %c0 = const 0
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            assign %c0 to %a
        }
        "#,
    );
    let Verdict::Accept(LoopPlan::Broadcast { .. }) = verdict else {
        panic!("expected broadcast acceptance, got {verdict:?}");
    };
}

#[test]
fn broadcast_into_derived_array_is_rejected() {
    let verdict = prove_broadcast(
        r#"
        main {
            %s = scalar derived
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : derived
            assign %s to %a
        }
        "#,
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::StructuralMismatch(_)));
}

#[test]
fn broadcast_of_array_rhs_is_rejected() {
    let verdict = prove_broadcast(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            assign %b to %a
        }
        "#,
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::StructuralMismatch(_)));
}

#[test]
fn broadcast_of_an_elemental_value_is_rejected() {
    // Array-shaped but not a scalar; the broadcast path must not claim it.
    let verdict = prove_broadcast(
        r#"
        main {
            %c100 = const 100
            %shp = shape %c100
            %a = array %shp : i64
            %b = array %shp : i64
            %e = elemental %shp (%i) {
                %d = designate %a [%i]
                %v = load %d
                yield %v
            }
            assign %e to %b
            destroy %e
        }
        "#,
    );
    assert_reject(&verdict, |r| matches!(r, RejectReason::StructuralMismatch(_)));
}
