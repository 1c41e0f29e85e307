// This module is the commit side of the analysis for the test IR: analyze_module runs
// the safety prover over every candidate and renders one verdict line per candidate,
// and rewrite_to_fixpoint additionally applies each accepted loop plan. A fusion plan
// turns the elemental into a do_loop emitted at the assignment point, repurposes the
// body's yield as a store through a designator at the loop indices, and retires the
// assign and destroy observers. A
// broadcast plan turns the assign into a do_loop with a fresh single-store body. One
// applied rewrite may expose a new candidate, so the driver re-runs the analysis until
// no accepted plan remains.

//! Verdict rendering and the fixpoint rewrite driver for the test IR.

use bumpalo::Bump;
use log::debug;

use super::adaptor::{TestAliasOracle, TestDominance, TestIRAdaptor};
use super::{OpData, OpKind, SubscriptData, TestIR};
use crate::core::{AnalysisSession, IrAdaptor, LoopPlan, SafetyProver, SessionStats, Verdict};

type TestPlan = LoopPlan<u32, u32, super::TypeKind>;

/// Run the prover over every candidate in the module and render one
/// verdict line per candidate, without mutating anything.
pub fn analyze_module(ir: &TestIR) -> String {
    let arena = Bump::new();
    let adaptor = TestIRAdaptor::new(ir);
    let oracle = TestAliasOracle::new(ir);
    let dom = TestDominance::new(ir);
    let session = AnalysisSession::new(&arena);
    let prover = SafetyProver::new(&adaptor, &oracle, &dom, &session);

    let mut output = String::new();
    for func in &ir.functions {
        output.push_str(&format!("Analyzing function {}\n", func.name));
        for &id in &ir.regions[func.body as usize] {
            match &ir.ops[id as usize].kind {
                OpKind::Elemental { .. } => {
                    output.push_str(&format!("Candidate elemental {}\n", ir.value_name(id)));
                    match prover.prove_elemental(id) {
                        Verdict::Accept(LoopPlan::Fusion { target, .. }) => {
                            output.push_str(&format!(
                                "Accept: fuse into {}\n",
                                ir.value_name(target)
                            ));
                        }
                        Verdict::Accept(_) => {}
                        Verdict::Reject(reason) => {
                            output.push_str(&format!("Reject[{}]: {}\n", reason.tag(), reason));
                        }
                    }
                }
                // Assignments from an elemental belong to the fusion
                // candidate above, not to the broadcast path.
                OpKind::Assign { src, dst, .. }
                    if !adaptor.is_array(*src)
                        && !matches!(ir.ops[*src as usize].kind, OpKind::Elemental { .. }) =>
                {
                    output.push_str(&format!(
                        "Candidate broadcast to {}\n",
                        ir.value_name(*dst)
                    ));
                    match prover.prove_broadcast(id) {
                        Verdict::Accept(LoopPlan::Broadcast { target, .. }) => {
                            output.push_str(&format!(
                                "Accept: expand into {}\n",
                                ir.value_name(target)
                            ));
                        }
                        Verdict::Accept(_) => {}
                        Verdict::Reject(reason) => {
                            output.push_str(&format!("Reject[{}]: {}\n", reason.tag(), reason));
                        }
                    }
                }
                _ => {}
            }
        }
    }
    output.push_str("End analysis\n");
    output.push_str(&session.stats().to_string());
    output
}

/// Apply accepted loop plans until none remain. Returns a log of the
/// applied rewrites.
pub fn rewrite_to_fixpoint(ir: &mut TestIR) -> String {
    let mut log = String::new();
    let mut total = SessionStats::default();
    let mut applied = 0usize;

    loop {
        let plan = {
            let arena = Bump::new();
            let adaptor = TestIRAdaptor::new(ir);
            let oracle = TestAliasOracle::new(ir);
            let dom = TestDominance::new(ir);
            let session = AnalysisSession::new(&arena);
            let prover = SafetyProver::new(&adaptor, &oracle, &dom, &session);
            let plan = find_accepted(ir, &adaptor, &prover);
            total.absorb(&session.stats());
            plan
        };
        match plan {
            Some(LoopPlan::Fusion { elemental, assign, destroy, target, .. }) => {
                log.push_str(&format!(
                    "Fused elemental {} into {}\n",
                    ir.value_name(elemental),
                    ir.value_name(target)
                ));
                apply_fusion(ir, elemental, assign, destroy, target);
                applied += 1;
            }
            Some(LoopPlan::Broadcast { assign, scalar, target, .. }) => {
                log.push_str(&format!(
                    "Expanded broadcast of {} into {}\n",
                    ir.value_name(scalar),
                    ir.value_name(target)
                ));
                apply_broadcast(ir, assign, scalar, target);
                applied += 1;
            }
            None => break,
        }
    }

    debug!("fixpoint after {} rewrites\n{}", applied, total);
    log.push_str(&format!("Applied {} rewrites\n", applied));
    log
}

/// First candidate in module order whose plan is accepted.
fn find_accepted(
    ir: &TestIR,
    adaptor: &TestIRAdaptor<'_>,
    prover: &SafetyProver<'_, '_, TestIRAdaptor<'_>, TestAliasOracle, TestDominance<'_>>,
) -> Option<TestPlan> {
    for func in &ir.functions {
        for &id in &ir.regions[func.body as usize] {
            match &ir.ops[id as usize].kind {
                OpKind::Elemental { .. } => {
                    if let Verdict::Accept(plan) = prover.prove_elemental(id) {
                        return Some(plan);
                    }
                }
                // Broadcast expansion needs the target's shape, so it is
                // only attempted on direct array variables.
                OpKind::Assign { src, dst, .. }
                    if !adaptor.is_array(*src)
                        && !matches!(ir.ops[*src as usize].kind, OpKind::Elemental { .. })
                        && matches!(ir.ops[*dst as usize].kind, OpKind::Array { .. }) =>
                {
                    if let Verdict::Accept(plan) = prover.prove_broadcast(id) {
                        return Some(plan);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Erase an op: drop it from its region and leave a nop behind.
fn remove_op(ir: &mut TestIR, id: u32) {
    let region = ir.ops[id as usize].region;
    ir.ops[id as usize].kind = OpKind::Nop;
    ir.regions[region as usize].retain(|&other| other != id);
    ir.renumber_region(region);
}

fn apply_fusion(ir: &mut TestIR, elemental: u32, assign: u32, destroy: u32, target: u32) {
    let OpKind::Elemental { shape, indices, body, ordered, .. } =
        ir.ops[elemental as usize].kind.clone()
    else {
        return;
    };

    // The yield becomes a store through the target at the loop indices.
    let Some(&yield_id) = ir.regions[body as usize].last() else {
        return;
    };
    let OpKind::Yield(yielded) = ir.ops[yield_id as usize].kind else {
        return;
    };
    ir.ops[yield_id as usize].name = format!("addr{}", yield_id);
    ir.ops[yield_id as usize].kind = OpKind::Designate {
        base: target,
        component: None,
        subscripts: indices.iter().map(|&idx| SubscriptData::Index(idx)).collect(),
        substring: None,
        complex_part: None,
        params: Vec::new(),
    };
    let store_id = ir.ops.len() as u32;
    ir.ops.push(OpData {
        name: String::new(),
        kind: OpKind::Store { value: yielded, addr: yield_id },
        region: body,
        pos: 0,
    });
    ir.regions[body as usize].push(store_id);
    ir.renumber_region(body);

    // The safety proof licenses the loop at the assignment point: the span
    // between the elemental and the assign was only shown to commute with
    // the body's effects, never with the stores into the target.
    let region = ir.ops[elemental as usize].region;
    let order = &mut ir.regions[region as usize];
    order.retain(|&id| id != elemental);
    let at = order
        .iter()
        .position(|&id| id == assign)
        .unwrap_or(order.len());
    order.insert(at, elemental);
    ir.renumber_region(region);

    ir.ops[elemental as usize].kind = OpKind::DoLoop { shape, indices, body, ordered };
    remove_op(ir, assign);
    remove_op(ir, destroy);
}

fn apply_broadcast(ir: &mut TestIR, assign: u32, scalar: u32, target: u32) {
    let OpKind::Array { shape, .. } = ir.ops[target as usize].kind else {
        return;
    };
    let OpKind::Shape(extents) = &ir.ops[shape as usize].kind else {
        return;
    };
    let rank = extents.len();

    let body = ir.regions.len() as u32;
    ir.regions.push(Vec::new());

    let mut indices = Vec::new();
    for dim in 0..rank {
        let id = ir.ops.len() as u32;
        ir.ops.push(OpData {
            name: format!("bi{}_{}", assign, dim),
            kind: OpKind::Index,
            region: body,
            pos: 0,
        });
        ir.regions[body as usize].push(id);
        indices.push(id);
    }
    let addr = ir.ops.len() as u32;
    ir.ops.push(OpData {
        name: format!("addr{}", assign),
        kind: OpKind::Designate {
            base: target,
            component: None,
            subscripts: indices.iter().map(|&idx| SubscriptData::Index(idx)).collect(),
            substring: None,
            complex_part: None,
            params: Vec::new(),
        },
        region: body,
        pos: 0,
    });
    ir.regions[body as usize].push(addr);
    let store = ir.ops.len() as u32;
    ir.ops.push(OpData {
        name: String::new(),
        kind: OpKind::Store { value: scalar, addr },
        region: body,
        pos: 0,
    });
    ir.regions[body as usize].push(store);
    ir.renumber_region(body);

    ir.ops[assign as usize].kind = OpKind::DoLoop { shape, indices, body, ordered: false };
}
