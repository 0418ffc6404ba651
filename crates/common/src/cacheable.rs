//! The Cacheable Object contract (§3.6, §4.6, component F).
//!
//! A single mixin-equivalent (`DirtyState`) provides the dirty bit and
//! sequence number; `Cacheable`/`Freezable` are traits so every concrete
//! storage type (Interface, CGraph, GeneticCode) implements the contract
//! once, per §9's "express as a trait with default implementations"
//! guidance for the original's mixin-based design.

use std::sync::atomic::{AtomicI64, Ordering};

/// Process-wide monotonic sequence source. Starts at `i64::MIN` to give the
/// longest possible LRU history before wraparound (§4.6).
static NEXT_SEQ: AtomicI64 = AtomicI64::new(i64::MIN);

pub fn next_seq() -> i64 {
    NEXT_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Embeddable dirty-bit + sequence-number state.
///
/// `Auto`-dirty collections flip the bit on every mutating call through
/// their collection API; `Manual`-dirty collections require the owner to
/// call `mark_dirty()` explicitly after a batch of edits (§4.6).
#[derive(Debug, Clone)]
pub struct DirtyState {
    dirty: bool,
    seq_num: i64,
}

impl DirtyState {
    pub fn new() -> Self {
        DirtyState {
            dirty: false,
            seq_num: next_seq(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.seq_num = next_seq();
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn touch(&mut self) {
        self.seq_num = next_seq();
    }

    pub fn seq_num(&self) -> i64 {
        self.seq_num
    }
}

impl Default for DirtyState {
    fn default() -> Self {
        DirtyState::new()
    }
}

/// Trait every cacheable object implements (§3.6).
pub trait Cacheable {
    fn is_dirty(&self) -> bool;
    fn mark_dirty(&mut self);
    fn mark_clean(&mut self);
    fn seq_num(&self) -> i64;
    fn touch(&mut self);

    /// Fast structural checks (cheap, called frequently).
    fn verify(&self) -> bool {
        true
    }

    /// Slow semantic checks (ancestor matching, signature recomputation).
    fn consistency(&self) -> bool {
        self.verify()
    }
}

/// Objects that become immutable after an explicit `freeze()` call
/// (Interfaces, CGraphs). Mutating operations must fail once frozen.
pub trait Freezable {
    fn freeze(&mut self);
    fn is_frozen(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }

    #[test]
    fn dirty_state_lifecycle() {
        let mut s = DirtyState::new();
        assert!(!s.is_dirty());
        let seq0 = s.seq_num();
        s.mark_dirty();
        assert!(s.is_dirty());
        assert!(s.seq_num() > seq0);
        s.mark_clean();
        assert!(!s.is_dirty());
    }

    #[test]
    fn touch_bumps_seq_without_dirty() {
        let mut s = DirtyState::new();
        let seq0 = s.seq_num();
        s.touch();
        assert!(s.seq_num() > seq0);
        assert!(!s.is_dirty());
    }
}
