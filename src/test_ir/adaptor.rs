//! Test IR adaptor implementation for the bufferization analysis.
//!
//! This adaptor lets the decision procedure work with the textual test IR,
//! enabling analysis tests with simple hand-written cases. Values are
//! identified with the op that defines them, so `ValueRef` and `OpRef` are
//! both plain op indices.

use super::{OpKind, SubscriptData, TestIR, TypeKind};
use crate::core::{
    AliasKind, AliasOracle, ComplexPart, Designator, DominanceOracle, EffectInstance,
    ElementalDesc, IrAdaptor, ObserverKind, Subscript,
};

/// Adaptor that implements [`IrAdaptor`] for [`TestIR`].
pub struct TestIRAdaptor<'ir> {
    ir: &'ir TestIR,
}

impl<'ir> TestIRAdaptor<'ir> {
    pub fn new(ir: &'ir TestIR) -> Self {
        Self { ir }
    }

    fn kind(&self, id: u32) -> &'ir OpKind {
        &self.ir.ops[id as usize].kind
    }
}

impl<'ir> IrAdaptor for TestIRAdaptor<'ir> {
    type ValueRef = u32;
    type OpRef = u32;
    type TypeRef = TypeKind;

    fn next_op(&self, op: u32) -> Option<u32> {
        let data = &self.ir.ops[op as usize];
        self.ir.regions[data.region as usize]
            .get(data.pos as usize + 1)
            .copied()
    }

    fn same_block(&self, a: u32, b: u32) -> bool {
        self.ir.ops[a as usize].region == self.ir.ops[b as usize].region
    }

    fn op_result(&self, op: u32) -> Option<u32> {
        self.kind(op).has_result().then_some(op)
    }

    fn users(&self, val: u32) -> Box<dyn Iterator<Item = u32> + '_> {
        Box::new(
            (0..self.ir.ops.len() as u32)
                .filter(move |&id| self.kind(id).operands().contains(&val)),
        )
    }

    fn op_effects(&self, op: u32) -> Option<Vec<EffectInstance<u32>>> {
        match self.kind(op) {
            OpKind::Load(addr) => Some(vec![EffectInstance::read(*addr)]),
            OpKind::Store { value: _, addr } => Some(vec![EffectInstance::write(*addr)]),
            OpKind::Assign { src, dst, .. } => {
                Some(vec![EffectInstance::read(*src), EffectInstance::write(*dst)])
            }
            OpKind::Call { pure_call: false, .. } => None,
            // Region-holding ops carry their body's effects. One
            // unanalyzable op inside poisons the whole nest.
            OpKind::Elemental { body, .. } | OpKind::DoLoop { body, .. } => {
                let mut effects = Vec::new();
                for &inner in &self.ir.regions[*body as usize] {
                    effects.extend(self.op_effects(inner)?);
                }
                Some(effects)
            }
            _ => Some(Vec::new()),
        }
    }

    fn int_constant(&self, val: u32) -> Option<i64> {
        match self.kind(val) {
            OpKind::Const(c) => Some(*c),
            _ => None,
        }
    }

    fn strip_converts(&self, mut val: u32) -> u32 {
        while let OpKind::Convert(inner) = self.kind(val) {
            val = *inner;
        }
        val
    }

    fn as_add(&self, val: u32) -> Option<(u32, u32)> {
        match self.kind(val) {
            OpKind::Add(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    fn as_sub(&self, val: u32) -> Option<(u32, u32)> {
        match self.kind(val) {
            OpKind::Sub(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    fn dim_lower_bound(&self, val: u32) -> Option<(u32, usize)> {
        match self.kind(val) {
            OpKind::LBound { base, dim } => Some((*base, *dim)),
            _ => None,
        }
    }

    fn designator(&self, val: u32) -> Option<Designator<u32>> {
        let OpKind::Designate { base, component, subscripts, substring, complex_part, params } =
            self.kind(val)
        else {
            return None;
        };
        Some(Designator {
            base: *base,
            component: component.clone(),
            component_shape: None,
            substring: *substring,
            complex_part: *complex_part,
            type_params: params.clone(),
            subscripts: subscripts
                .iter()
                .map(|sub| match *sub {
                    SubscriptData::Index(idx) => Subscript::Index(idx),
                    SubscriptData::Triplet { lb, ub, stride } => {
                        Subscript::Triplet { lb, ub, stride }
                    }
                })
                .collect(),
        })
    }

    fn is_array(&self, val: u32) -> bool {
        match self.kind(val) {
            // Only storage-backed values qualify; an elemental result is an
            // array-shaped expression, not something that can be assigned
            // into.
            OpKind::Array { .. } => true,
            // A designate is array-valued when it sections the base; pure
            // index subscripts select one element.
            OpKind::Designate { base, subscripts, .. } => {
                if subscripts.is_empty() {
                    self.is_array(*base)
                } else {
                    subscripts
                        .iter()
                        .any(|sub| matches!(sub, SubscriptData::Triplet { .. }))
                }
            }
            _ => false,
        }
    }

    fn element_type(&self, val: u32) -> Option<TypeKind> {
        match self.kind(val) {
            OpKind::Array { ty, .. } | OpKind::Scalar(ty) => Some(*ty),
            OpKind::Const(_)
            | OpKind::Add(..)
            | OpKind::Sub(..)
            | OpKind::Mul(..)
            | OpKind::LBound { .. }
            | OpKind::Index => Some(TypeKind::I64),
            OpKind::Convert(inner) | OpKind::Load(inner) => self.element_type(*inner),
            OpKind::Designate { base, .. } => self.element_type(*base),
            _ => None,
        }
    }

    fn is_trivial_type(&self, ty: TypeKind) -> bool {
        ty != TypeKind::Derived
    }

    fn as_elemental(&self, op: u32) -> Option<ElementalDesc<u32, u32>> {
        let OpKind::Elemental { shape, indices, body, ordered, temp } = self.kind(op) else {
            return None;
        };
        let region = &self.ir.regions[*body as usize];
        let yield_op = *region.last()?;
        let OpKind::Yield(yielded) = self.kind(yield_op) else {
            return None;
        };
        // Index ops sit at the head of the body region.
        let body_first = region
            .iter()
            .copied()
            .find(|&id| !matches!(self.kind(id), OpKind::Index))
            .unwrap_or(yield_op);
        Some(ElementalDesc {
            shape: *shape,
            indices: indices.clone(),
            body_first,
            yield_op,
            yielded: *yielded,
            is_ordered: *ordered,
            must_produce_temp: *temp,
        })
    }

    fn classify_observer(&self, op: u32) -> ObserverKind<u32> {
        match self.kind(op) {
            OpKind::Assign { src, dst, realloc } => ObserverKind::Assign {
                lhs: *dst,
                rhs: *src,
                is_realloc: *realloc,
            },
            OpKind::Destroy { finalize, .. } => {
                ObserverKind::Destroy { must_finalize: *finalize }
            }
            _ => ObserverKind::Other,
        }
    }
}

/// Alias oracle over the test IR. Values are resolved through designate
/// and convert chains to their root storage: identical values must alias,
/// values rooted in the same storage may alias, `mayalias`-declared pairs
/// may alias, and everything else does not alias.
pub struct TestAliasOracle {
    roots: Vec<u32>,
    declared: Vec<(u32, u32)>,
}

impl TestAliasOracle {
    pub fn new(ir: &TestIR) -> Self {
        let mut roots = Vec::with_capacity(ir.ops.len());
        for id in 0..ir.ops.len() as u32 {
            roots.push(Self::root_of(ir, id));
        }
        let declared = ir
            .ops
            .iter()
            .filter_map(|op| match op.kind {
                OpKind::MayAlias { a, b } => Some((roots[a as usize], roots[b as usize])),
                _ => None,
            })
            .collect();
        Self { roots, declared }
    }

    fn root_of(ir: &TestIR, mut id: u32) -> u32 {
        loop {
            match &ir.ops[id as usize].kind {
                OpKind::Designate { base, .. } => id = *base,
                OpKind::Convert(inner) => id = *inner,
                _ => return id,
            }
        }
    }
}

impl AliasOracle<u32> for TestAliasOracle {
    fn alias(&self, a: u32, b: u32) -> AliasKind {
        if a == b {
            return AliasKind::Must;
        }
        let (ra, rb) = (self.roots[a as usize], self.roots[b as usize]);
        if ra == rb {
            return AliasKind::May;
        }
        if self
            .declared
            .iter()
            .any(|&(x, y)| (x == ra && y == rb) || (x == rb && y == ra))
        {
            return AliasKind::May;
        }
        AliasKind::No
    }
}

/// Dominance over the test IR: within a region, program order.
pub struct TestDominance<'ir> {
    ir: &'ir TestIR,
}

impl<'ir> TestDominance<'ir> {
    pub fn new(ir: &'ir TestIR) -> Self {
        Self { ir }
    }
}

impl<'ir> DominanceOracle<u32> for TestDominance<'ir> {
    fn properly_dominates(&self, a: u32, b: u32) -> bool {
        let (da, db) = (&self.ir.ops[a as usize], &self.ir.ops[b as usize]);
        da.region == db.region && da.pos < db.pos
    }
}
