// This module provides arena-based analysis session management using the bumpalo crate.
// AnalysisSession owns the arena that backs the effect lists and obligation sets built
// during one pass invocation, caches designator decompositions so repeated classifier
// queries against the same assignment target stay cheap, and tracks statistics about
// how candidates fared (analyzed, accepted, rejected per reason). The session replaces
// what would otherwise be process-wide memoized state: it is created by the pass driver,
// passed by reference into every analysis call, and dropped with the compilation unit.

//! Arena-backed analysis session: caches and statistics for one pass
//! invocation. Nothing in here outlives the session.

use std::cell::RefCell;
use std::fmt;

use bumpalo::Bump;
use hashbrown::HashMap;

use super::adaptor::IrAdaptor;
use super::error::RejectReason;
use super::overlap::Designator;

/// Per-invocation state of the bufferization analysis.
pub struct AnalysisSession<'arena, A: IrAdaptor> {
    /// Arena for effect lists and obligation sets.
    arena: &'arena Bump,

    /// Memoized designator decompositions.
    designators: RefCell<HashMap<A::ValueRef, Option<Designator<A::ValueRef>>>>,

    /// Outcome counters.
    stats: RefCell<SessionStats>,
}

impl<'arena, A: IrAdaptor> AnalysisSession<'arena, A> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            designators: RefCell::new(HashMap::new()),
            stats: RefCell::new(SessionStats::default()),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Designator decomposition of `val`, memoized across queries.
    pub fn designator(&self, ir: &A, val: A::ValueRef) -> Option<Designator<A::ValueRef>> {
        if let Some(cached) = self.designators.borrow().get(&val) {
            return cached.clone();
        }
        let computed = ir.designator(val);
        self.designators
            .borrow_mut()
            .insert(val, computed.clone());
        computed
    }

    pub fn record_candidate(&self) {
        self.stats.borrow_mut().candidates += 1;
    }

    pub fn record_accept(&self) {
        self.stats.borrow_mut().accepted += 1;
    }

    pub fn record_reject(&self, reason: &RejectReason) {
        let mut stats = self.stats.borrow_mut();
        stats.rejected += 1;
        *stats.reject_counts.entry(reason.tag()).or_insert(0) += 1;
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Analysis outcome statistics for one session.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Candidates handed to the prover.
    pub candidates: usize,

    /// Candidates accepted for in-place fusion.
    pub accepted: usize,

    /// Candidates left as buffered temporaries.
    pub rejected: usize,

    /// Rejection counts keyed by reason tag.
    pub reject_counts: HashMap<&'static str, usize>,
}

impl SessionStats {
    /// Fold another session's counters into this one. The fixpoint driver
    /// runs one session per round and aggregates here.
    pub fn absorb(&mut self, other: &SessionStats) {
        self.candidates += other.candidates;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        for (tag, count) in &other.reject_counts {
            *self.reject_counts.entry(tag).or_insert(0) += count;
        }
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bufferization Analysis Statistics:")?;
        writeln!(f, "  Candidates analyzed: {}", self.candidates)?;
        writeln!(f, "  Accepted: {}", self.accepted)?;
        writeln!(f, "  Rejected: {}", self.rejected)?;

        if !self.reject_counts.is_empty() {
            writeln!(f, "  Rejection breakdown:")?;
            let mut sorted: Vec<_> = self.reject_counts.iter().collect();
            sorted.sort_by_key(|(tag, count)| (std::cmp::Reverse(**count), **tag));
            for (tag, count) in sorted {
                writeln!(f, "    {}: {}", tag, count)?;
            }
        }

        Ok(())
    }
}
