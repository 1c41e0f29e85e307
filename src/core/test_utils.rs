// This module provides a minimal in-memory expression graph implementing the IrAdaptor
// trait, for unit-testing the section model and the overlap classifier without pulling
// in the full textual test IR. Values are indices into a node vector; nodes cover just
// the shapes the scalar queries and designator decomposition care about: constants,
// additions, subtractions, conversion wrappers, opaque values, arrays and designators.
// Everything related to effects, elementals and observers answers "nothing here".

//! Test helpers: a tiny expression-graph adaptor.

use super::adaptor::{ElementalDesc, IrAdaptor, ObserverKind};
use super::effects::EffectInstance;
use super::overlap::Designator;
use super::section::Subscript;

#[derive(Debug, Clone)]
enum Node {
    Const(i64),
    Add(usize, usize),
    Sub(usize, usize),
    Convert(usize),
    Opaque,
    Array,
    LBound { base: usize, dim: usize },
    Designate {
        base: usize,
        subscripts: Vec<Subscript<usize>>,
    },
}

/// Expression graph for unit tests. Each builder method returns the value id
/// of the new node.
#[derive(Debug, Default)]
pub struct ExprIr {
    nodes: Vec<Node>,
}

impl ExprIr {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn constant(&mut self, value: i64) -> usize {
        self.push(Node::Const(value))
    }

    pub fn add(&mut self, lhs: usize, rhs: usize) -> usize {
        self.push(Node::Add(lhs, rhs))
    }

    pub fn sub(&mut self, lhs: usize, rhs: usize) -> usize {
        self.push(Node::Sub(lhs, rhs))
    }

    pub fn convert(&mut self, value: usize) -> usize {
        self.push(Node::Convert(value))
    }

    pub fn opaque(&mut self) -> usize {
        self.push(Node::Opaque)
    }

    pub fn array(&mut self) -> usize {
        self.push(Node::Array)
    }

    pub fn designate(&mut self, base: usize, subscripts: Vec<Subscript<usize>>) -> usize {
        self.push(Node::Designate { base, subscripts })
    }

    pub fn lower_bound(&mut self, base: usize, dim: usize) -> usize {
        self.push(Node::LBound { base, dim })
    }
}

impl IrAdaptor for ExprIr {
    type ValueRef = usize;
    type OpRef = usize;
    type TypeRef = ();

    fn next_op(&self, _op: usize) -> Option<usize> {
        None
    }

    fn same_block(&self, _a: usize, _b: usize) -> bool {
        true
    }

    fn op_result(&self, op: usize) -> Option<usize> {
        Some(op)
    }

    fn users(&self, _val: usize) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(std::iter::empty())
    }

    fn op_effects(&self, _op: usize) -> Option<Vec<EffectInstance<usize>>> {
        Some(Vec::new())
    }

    fn int_constant(&self, val: usize) -> Option<i64> {
        match self.nodes[val] {
            Node::Const(c) => Some(c),
            _ => None,
        }
    }

    fn strip_converts(&self, mut val: usize) -> usize {
        while let Node::Convert(inner) = self.nodes[val] {
            val = inner;
        }
        val
    }

    fn as_add(&self, val: usize) -> Option<(usize, usize)> {
        match self.nodes[val] {
            Node::Add(lhs, rhs) => Some((lhs, rhs)),
            _ => None,
        }
    }

    fn as_sub(&self, val: usize) -> Option<(usize, usize)> {
        match self.nodes[val] {
            Node::Sub(lhs, rhs) => Some((lhs, rhs)),
            _ => None,
        }
    }

    fn dim_lower_bound(&self, val: usize) -> Option<(usize, usize)> {
        match self.nodes[val] {
            Node::LBound { base, dim } => Some((base, dim)),
            _ => None,
        }
    }

    fn designator(&self, val: usize) -> Option<Designator<usize>> {
        match &self.nodes[val] {
            Node::Designate { base, subscripts } => {
                Some(Designator::simple(*base, subscripts.clone()))
            }
            _ => None,
        }
    }

    fn is_array(&self, val: usize) -> bool {
        matches!(self.nodes[val], Node::Array | Node::Designate { .. })
    }

    fn element_type(&self, _val: usize) -> Option<()> {
        Some(())
    }

    fn is_trivial_type(&self, _ty: ()) -> bool {
        true
    }

    fn as_elemental(&self, _op: usize) -> Option<ElementalDesc<usize, usize>> {
        None
    }

    fn classify_observer(&self, _op: usize) -> ObserverKind<usize> {
        ObserverKind::Other
    }
}
