// This module implements the overlap classifier for pairs of array designators. Given
// two values, it decides whether they address definitely identical element sets,
// definitely disjoint ones, either-identical-or-disjoint ones, or whether nothing can
// be said. The alias oracle can report that two references overlap somehow; only this
// classifier can tell whether that overlap is exact or absent, because it understands
// the subscript structure of the designators. The walk over subscript pairs
// short-circuits on the first proven-disjoint dimension and otherwise accumulates two
// flags (triplets differ, indices differ) that drive the final tie-breaking table.

//! Designator decomposition and slice overlap classification.

use log::debug;

use super::adaptor::IrAdaptor;
use super::section::{disjoint_sections, SectionDesc, Subscript};
use super::session::AnalysisSession;

/// Which part of a complex value a designator selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexPart {
    Real,
    Imag,
}

/// Structured reference into an array: base plus everything that narrows it.
///
/// Two designators are only comparable when `base`, `component`,
/// `component_shape`, `substring`, `complex_part` and `type_params` are all
/// pairwise equal; the subscripts are then compared dimension by dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Designator<V> {
    pub base: V,
    pub component: Option<String>,
    pub component_shape: Option<V>,
    pub substring: Option<(V, V)>,
    pub complex_part: Option<ComplexPart>,
    pub type_params: Vec<V>,
    pub subscripts: Vec<Subscript<V>>,
}

impl<V> Designator<V> {
    /// A designator that selects whole elements of `base` by subscripts only.
    pub fn simple(base: V, subscripts: Vec<Subscript<V>>) -> Self {
        Designator {
            base,
            component: None,
            component_shape: None,
            substring: None,
            complex_part: None,
            type_params: Vec::new(),
            subscripts,
        }
    }
}

/// Classification of the relationship between two designators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapKind {
    /// Overlap is unknown.
    Unknown,
    /// The references are definitely identical.
    DefinitelyIdentical,
    /// The references are definitely disjoint.
    DefinitelyDisjoint,
    /// Either disjoint or identical: definitely no partial overlap.
    EitherIdenticalOrDisjoint,
}

/// Classify the overlap between two references.
///
/// Callers typically use this after the alias oracle reported an alias of
/// some kind, to refine "overlaps somehow" into identical or disjoint.
pub fn classify_overlap<A: IrAdaptor>(
    ir: &A,
    session: &AnalysisSession<'_, A>,
    ref1: A::ValueRef,
    ref2: A::ValueRef,
) -> OverlapKind {
    if ref1 == ref2 {
        return OverlapKind::DefinitelyIdentical;
    }

    // Only a pair of designators can be compared further.
    let Some(des1) = session.designator(ir, ref1) else {
        return OverlapKind::Unknown;
    };
    let Some(des2) = session.designator(ir, ref2) else {
        return OverlapKind::Unknown;
    };

    if des1.base != des2.base {
        debug!("no identical base for {:?} and {:?}", ref1, ref2);
        return OverlapKind::Unknown;
    }

    // Require all static components of the designators to be the same.
    // It might be too strict, e.g. we may probably allow for different
    // type parameters.
    if des1.component != des2.component
        || des1.component_shape != des2.component_shape
        || des1.substring != des2.substring
        || des1.complex_part != des2.complex_part
        || des1.type_params != des2.type_params
    {
        debug!("different designator specs for {:?} and {:?}", ref1, ref2);
        return OverlapKind::Unknown;
    }

    if des1.subscripts.len() != des2.subscripts.len() {
        debug!("subscript rank mismatch for {:?} and {:?}", ref1, ref2);
        return OverlapKind::Unknown;
    }

    let mut identical_triplets = true;
    let mut identical_indices = true;
    for (sub1, sub2) in des1.subscripts.iter().zip(des2.subscripts.iter()) {
        let desc1 = SectionDesc::from_subscript(ir, sub1);
        let desc2 = SectionDesc::from_subscript(ir, sub2);

        // One dimension with provably non-overlapping bounds makes the
        // whole references disjoint.
        if disjoint_sections(ir, &desc1, &desc2) {
            return OverlapKind::DefinitelyDisjoint;
        }

        if desc1 != desc2 {
            if sub1.is_triplet() || sub2.is_triplet() {
                identical_triplets = false;
                debug!("triplet mismatch for {:?} and {:?}", ref1, ref2);
            } else {
                identical_indices = false;
                debug!("index mismatch for {:?} and {:?}", ref1, ref2);
            }
        }
    }

    if identical_triplets {
        // Policy choice, not a general aliasing law: when every section
        // specifier matches, differing scalar subscripts select either the
        // same element or different ones of the same slice, so the
        // references are either identical or completely disjoint. This
        // mirrors the source language's array semantics and should be
        // revisited when retargeting.
        if identical_indices {
            return OverlapKind::DefinitelyIdentical;
        }
        return OverlapKind::EitherIdenticalOrDisjoint;
    }

    debug!("different sections for {:?} and {:?}", ref1, ref2);
    OverlapKind::Unknown
}
