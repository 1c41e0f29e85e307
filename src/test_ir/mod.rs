//! Test IR (BIR) parser and data structures for testing the bufferization analysis.
//!
//! This module provides a simple IR format for writing analysis tests
//! without depending on a full compiler IR. The format is designed to be:
//! - Human-readable and writable
//! - Easy to parse
//! - Sufficient for exercising every overlap and effect code path
//!
//! # BIR Format
//!
//! ```text
//! ; Comments start with semicolon
//! main {
//!     %c1 = const 1
//!     %c10 = const 10
//!     %shp = shape %c10
//!     %a = array %shp : i64
//!     %e = elemental %shp (%i) {
//!         %d = designate %a [%i]
//!         %v = load %d
//!         %r = add %v, %c1
//!         yield %r
//!     }
//!     assign %e to %a
//!     destroy %e
//! }
//! ```

use crate::core::ComplexPart;

pub mod adaptor;
pub mod check;
pub mod parser;
pub mod rewrite;

pub use adaptor::{TestAliasOracle, TestDominance, TestIRAdaptor};
pub use check::{CheckDirective, TestRunner, TestSpec};
pub use rewrite::{analyze_module, rewrite_to_fixpoint};

/// Scalar element types known to the test IR. `derived` stands in for any
/// type with user-defined assignment or finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    I64,
    F64,
    Derived,
}

impl TypeKind {
    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::I64 => "i64",
            TypeKind::F64 => "f64",
            TypeKind::Derived => "derived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "i64" => Some(TypeKind::I64),
            "f64" => Some(TypeKind::F64),
            "derived" => Some(TypeKind::Derived),
            _ => None,
        }
    }
}

/// One subscript of a designate op: a single index or a `lb:ub:stride`
/// section triplet. Operands are op indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptData {
    Index(u32),
    Triplet { lb: u32, ub: u32, stride: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    /// Integer literal.
    Const(i64),
    /// Opaque scalar of the given type.
    Scalar(TypeKind),
    /// Extent list for arrays and elementals.
    Shape(Vec<u32>),
    /// Array variable with a shape and an element type.
    Array { shape: u32, ty: TypeKind },
    /// Reference into a variable: subscripts, component, substring,
    /// complex part, type parameters.
    Designate {
        base: u32,
        component: Option<String>,
        subscripts: Vec<SubscriptData>,
        substring: Option<(u32, u32)>,
        complex_part: Option<ComplexPart>,
        params: Vec<u32>,
    },
    Load(u32),
    Store { value: u32, addr: u32 },
    Add(u32, u32),
    Sub(u32, u32),
    Mul(u32, u32),
    Convert(u32),
    /// Lower bound of `base` in dimension `dim`.
    LBound { base: u32, dim: usize },
    /// Induction value of an enclosing elemental or do_loop region.
    Index,
    /// Lazy per-element computation over `shape`; `indices` and the body
    /// live in region `body`, terminated by a yield.
    Elemental { shape: u32, indices: Vec<u32>, body: u32, ordered: bool, temp: bool },
    Yield(u32),
    Assign { src: u32, dst: u32, realloc: bool },
    Destroy { value: u32, finalize: bool },
    /// Opaque call. Non-pure calls have unknown effects.
    Call { callee: String, args: Vec<u32>, pure_call: bool },
    /// Declares two values as possibly aliasing for the test oracle.
    MayAlias { a: u32, b: u32 },
    /// Materialized loop nest produced by the rewrite driver.
    DoLoop { shape: u32, indices: Vec<u32>, body: u32, ordered: bool },
    /// Erased by the rewrite driver.
    Nop,
}

impl OpKind {
    /// Whether this op defines a result value.
    pub fn has_result(&self) -> bool {
        !matches!(
            self,
            OpKind::Store { .. }
                | OpKind::Yield(_)
                | OpKind::Assign { .. }
                | OpKind::Destroy { .. }
                | OpKind::MayAlias { .. }
                | OpKind::DoLoop { .. }
                | OpKind::Nop
        )
    }

    /// Value operands of this op, for user scans.
    pub fn operands(&self) -> Vec<u32> {
        match self {
            OpKind::Const(_) | OpKind::Scalar(_) | OpKind::Index | OpKind::Nop => Vec::new(),
            OpKind::Shape(extents) => extents.clone(),
            OpKind::Array { shape, .. } => vec![*shape],
            OpKind::Designate { base, subscripts, substring, params, .. } => {
                let mut ops = vec![*base];
                for sub in subscripts {
                    match sub {
                        SubscriptData::Index(idx) => ops.push(*idx),
                        SubscriptData::Triplet { lb, ub, stride } => {
                            ops.extend([*lb, *ub, *stride]);
                        }
                    }
                }
                if let Some((l, u)) = substring {
                    ops.extend([*l, *u]);
                }
                ops.extend(params.iter().copied());
                ops
            }
            OpKind::Load(addr) => vec![*addr],
            OpKind::Store { value, addr } => vec![*value, *addr],
            OpKind::Add(a, b) | OpKind::Sub(a, b) | OpKind::Mul(a, b) => vec![*a, *b],
            OpKind::Convert(v) => vec![*v],
            OpKind::LBound { base, .. } => vec![*base],
            OpKind::Elemental { shape, .. } => vec![*shape],
            OpKind::Yield(v) => vec![*v],
            OpKind::Assign { src, dst, .. } => vec![*src, *dst],
            OpKind::Destroy { value, .. } => vec![*value],
            OpKind::Call { args, .. } => args.clone(),
            OpKind::MayAlias { a, b } => vec![*a, *b],
            OpKind::DoLoop { shape, .. } => vec![*shape],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpData {
    /// Result name without the `%` sigil; empty for ops without a result.
    pub name: String,
    pub kind: OpKind,
    /// Region this op belongs to. Region 0..functions.len() are function
    /// bodies; elemental and do_loop bodies come after.
    pub region: u32,
    /// Position within the region, kept dense by `renumber_region`.
    pub pos: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    /// Region index of the function body.
    pub body: u32,
}

/// Flat op store: ops live in `ops`, ordered per region by the id lists in
/// `regions`. Values are identified with the op that defines them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestIR {
    pub functions: Vec<Function>,
    pub ops: Vec<OpData>,
    pub regions: Vec<Vec<u32>>,
}

impl TestIR {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        parser::parse_ir(text)
    }

    /// Reassign dense positions after inserting into or removing from a
    /// region's op list.
    pub fn renumber_region(&mut self, region: u32) {
        let ids = self.regions[region as usize].clone();
        for (pos, id) in ids.iter().enumerate() {
            self.ops[*id as usize].pos = pos as u32;
        }
    }

    /// `%name` of the value defined by op `id`.
    pub fn value_name(&self, id: u32) -> String {
        format!("%{}", self.ops[id as usize].name)
    }

    pub fn print(&self) -> String {
        let mut output = String::new();
        output.push_str("Printing IR\n");
        for func in &self.functions {
            output.push_str(&format!("Function {}\n", func.name));
            self.print_region(func.body, 1, &mut output);
        }
        output
    }

    fn print_region(&self, region: u32, depth: usize, output: &mut String) {
        let indent = "  ".repeat(depth);
        for &id in &self.regions[region as usize] {
            let op = &self.ops[id as usize];
            if matches!(op.kind, OpKind::Nop) {
                continue;
            }
            output.push_str(&indent);
            if op.kind.has_result() {
                output.push_str(&format!("%{} = ", op.name));
            }
            self.print_op(id, depth, output);
            output.push('\n');
        }
    }

    fn print_op(&self, id: u32, depth: usize, output: &mut String) {
        let n = |v: &u32| self.value_name(*v);
        match &self.ops[id as usize].kind {
            OpKind::Const(c) => output.push_str(&format!("const {}", c)),
            OpKind::Scalar(ty) => output.push_str(&format!("scalar {}", ty.name())),
            OpKind::Shape(extents) => {
                let list: Vec<_> = extents.iter().map(n).collect();
                output.push_str(&format!("shape {}", list.join(", ")));
            }
            OpKind::Array { shape, ty } => {
                output.push_str(&format!("array {} : {}", n(shape), ty.name()));
            }
            OpKind::Designate { base, component, subscripts, substring, complex_part, params } => {
                output.push_str(&format!("designate {}", n(base)));
                if let Some(c) = component {
                    output.push_str(&format!(" component {}", c));
                }
                let subs: Vec<_> = subscripts
                    .iter()
                    .map(|sub| match sub {
                        SubscriptData::Index(idx) => n(idx),
                        SubscriptData::Triplet { lb, ub, stride } => {
                            format!("{}:{}:{}", n(lb), n(ub), n(stride))
                        }
                    })
                    .collect();
                output.push_str(&format!(" [{}]", subs.join(", ")));
                if let Some((l, u)) = substring {
                    output.push_str(&format!(" substr {}, {}", n(l), n(u)));
                }
                match complex_part {
                    Some(ComplexPart::Real) => output.push_str(" real"),
                    Some(ComplexPart::Imag) => output.push_str(" imag"),
                    None => {}
                }
                if !params.is_empty() {
                    let list: Vec<_> = params.iter().map(n).collect();
                    output.push_str(&format!(" params {}", list.join(", ")));
                }
            }
            OpKind::Load(addr) => output.push_str(&format!("load {}", n(addr))),
            OpKind::Store { value, addr } => {
                output.push_str(&format!("store {}, {}", n(value), n(addr)));
            }
            OpKind::Add(a, b) => output.push_str(&format!("add {}, {}", n(a), n(b))),
            OpKind::Sub(a, b) => output.push_str(&format!("sub {}, {}", n(a), n(b))),
            OpKind::Mul(a, b) => output.push_str(&format!("mul {}, {}", n(a), n(b))),
            OpKind::Convert(v) => output.push_str(&format!("convert {}", n(v))),
            OpKind::LBound { base, dim } => {
                output.push_str(&format!("lbound {}, {}", n(base), dim));
            }
            OpKind::Index => output.push_str("index"),
            OpKind::Elemental { shape, indices, body, ordered, temp } => {
                output.push_str(&format!("elemental {}", n(shape)));
                if *ordered {
                    output.push_str(" ordered");
                }
                if *temp {
                    output.push_str(" temp");
                }
                let list: Vec<_> = indices.iter().map(n).collect();
                output.push_str(&format!(" ({}) {{\n", list.join(", ")));
                self.print_body(*body, indices, depth, output);
            }
            OpKind::Yield(v) => output.push_str(&format!("yield {}", n(v))),
            OpKind::Assign { src, dst, realloc } => {
                output.push_str(&format!("assign {} to {}", n(src), n(dst)));
                if *realloc {
                    output.push_str(" realloc");
                }
            }
            OpKind::Destroy { value, finalize } => {
                output.push_str(&format!("destroy {}", n(value)));
                if *finalize {
                    output.push_str(" finalize");
                }
            }
            OpKind::Call { callee, args, pure_call } => {
                output.push_str("call ");
                if *pure_call {
                    output.push_str("pure ");
                }
                let list: Vec<_> = args.iter().map(n).collect();
                output.push_str(&format!("@{}({})", callee, list.join(", ")));
            }
            OpKind::MayAlias { a, b } => {
                output.push_str(&format!("mayalias {}, {}", n(a), n(b)));
            }
            OpKind::DoLoop { shape, indices, body, ordered } => {
                output.push_str(&format!("do_loop {}", n(shape)));
                if *ordered {
                    output.push_str(" ordered");
                }
                let list: Vec<_> = indices.iter().map(n).collect();
                output.push_str(&format!(" ({}) {{\n", list.join(", ")));
                self.print_body(*body, indices, depth, output);
            }
            OpKind::Nop => {}
        }
    }

    fn print_body(&self, body: u32, indices: &[u32], depth: usize, output: &mut String) {
        // Index ops are declared in the header, not printed as body ops.
        let indent = "  ".repeat(depth + 1);
        for &bid in &self.regions[body as usize] {
            if indices.contains(&bid) {
                continue;
            }
            let bop = &self.ops[bid as usize];
            if matches!(bop.kind, OpKind::Nop) {
                continue;
            }
            output.push_str(&indent);
            if bop.kind.has_result() {
                output.push_str(&format!("%{} = ", bop.name));
            }
            self.print_op(bid, depth + 1, output);
            output.push('\n');
        }
        output.push_str(&format!("{}}}", "  ".repeat(depth)));
    }
}

impl std::fmt::Display for TestIR {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.print())
    }
}
