//! Effects domain.
//!
//! An [`Effects`] value approximates what evaluating one IR term may do:
//! read or write each argument slot, each local slot and the heap, and raise
//! an exception. It is the product of two [`ReadWriteVector`]s, one
//! [`ReadWrite`] and a boolean, ordered componentwise.
//!
//! Two effects are *commutable* when swapping the evaluation order of the
//! terms that produced them cannot change observable behavior. This is the
//! test the inliner uses before it moves an argument past other work.
//!
//! # Examples
//!
//! ```rust
//! use ilopt::analysis::{Effects, Frame, Lattice, ReadWrite};
//!
//! let frame = Frame::new(1, 1);
//! let read_local = Effects::local(frame, 0, ReadWrite::Read);
//! let write_heap = Effects::make_heap(frame, ReadWrite::Write, false);
//!
//! assert!(read_local.commutable_with(&write_heap));
//! assert!(!write_heap.commutable_with(&write_heap));
//! assert!(!Effects::all_commutable(&[read_local, write_heap]));
//! ```

use crate::{
    analysis::{Frame, Lattice, ReadWrite, ReadWriteVector},
    utils::BitSet,
};

/// Abstract side effects: `(argument vector, local vector, heap, may-throw)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Effects {
    args: ReadWriteVector,
    locals: ReadWriteVector,
    heap: ReadWrite,
    throws: bool,
}

impl Effects {
    /// Assembles an effects value from its components.
    #[must_use]
    pub fn new(
        args: ReadWriteVector,
        locals: ReadWriteVector,
        heap: ReadWrite,
        throws: bool,
    ) -> Self {
        Self {
            args,
            locals,
            heap,
            throws,
        }
    }

    /// No effect at all.
    #[must_use]
    pub fn bottom(frame: Frame) -> Self {
        Self::new(
            ReadWriteVector::bottom(frame.args),
            ReadWriteVector::bottom(frame.locals),
            ReadWrite::None,
            false,
        )
    }

    /// May write everything and throw.
    #[must_use]
    pub fn top(frame: Frame) -> Self {
        Self::new(
            ReadWriteVector::top(frame.args),
            ReadWriteVector::top(frame.locals),
            ReadWrite::Write,
            true,
        )
    }

    /// Touches argument `index` with polarity `rw`.
    #[must_use]
    pub fn arg(frame: Frame, index: usize, rw: ReadWrite) -> Self {
        Self {
            args: ReadWriteVector::with(frame.args, [index], rw),
            ..Self::bottom(frame)
        }
    }

    /// Touches local `index` with polarity `rw`.
    #[must_use]
    pub fn local(frame: Frame, index: usize, rw: ReadWrite) -> Self {
        Self {
            locals: ReadWriteVector::with(frame.locals, [index], rw),
            ..Self::bottom(frame)
        }
    }

    /// Touches the given argument and local slots with polarity `rw`.
    #[must_use]
    pub fn make_arg_local(
        frame: Frame,
        args: &BitSet,
        locals: &BitSet,
        rw: ReadWrite,
        throws: bool,
    ) -> Self {
        Self::new(
            ReadWriteVector::with(frame.args, args.iter(), rw),
            ReadWriteVector::with(frame.locals, locals.iter(), rw),
            ReadWrite::None,
            throws,
        )
    }

    /// Touches the heap with polarity `rw`.
    #[must_use]
    pub fn make_heap(frame: Frame, rw: ReadWrite, throws: bool) -> Self {
        Self {
            heap: rw,
            throws,
            ..Self::bottom(frame)
        }
    }

    /// Touches the given argument and local slots and the heap with polarity `rw`.
    #[must_use]
    pub fn make_arg_local_heap(
        frame: Frame,
        args: &BitSet,
        locals: &BitSet,
        rw: ReadWrite,
        throws: bool,
    ) -> Self {
        Self {
            heap: rw,
            ..Self::make_arg_local(frame, args, locals, rw, throws)
        }
    }

    /// May throw, touches nothing.
    #[must_use]
    pub fn make_throws(frame: Frame) -> Self {
        Self {
            throws: true,
            ..Self::bottom(frame)
        }
    }

    /// Returns the frame this value was built for.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::new(self.args.len(), self.locals.len())
    }

    /// Returns the per-argument polarities.
    #[must_use]
    pub fn args(&self) -> &ReadWriteVector {
        &self.args
    }

    /// Returns the per-local polarities.
    #[must_use]
    pub fn locals(&self) -> &ReadWriteVector {
        &self.locals
    }

    /// Returns the heap polarity.
    #[must_use]
    pub fn heap(&self) -> ReadWrite {
        self.heap
    }

    /// Returns `true` if evaluation may raise an exception.
    #[must_use]
    pub fn may_throw(&self) -> bool {
        self.throws
    }

    /// Returns `true` if nothing is written. Exceptions are not considered.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.args.is_read_only() && self.locals.is_read_only() && self.heap.is_read_only()
    }

    /// Returns `true` if every element may be evaluated in any order.
    ///
    /// This holds for the empty list and for lists of read-only, non-throwing
    /// effects. Any write makes the answer `false`, even when the writes are
    /// provably disjoint; pairwise interference is not analyzed here.
    #[must_use]
    pub fn all_commutable(effects: &[Effects]) -> bool {
        effects.iter().all(|e| !e.throws && e.is_read_only())
    }

    /// Returns a copy padded with untouched slots up to `frame`.
    #[must_use]
    pub fn extend_to(&self, frame: Frame) -> Self {
        Self {
            args: self.args.extended(frame.args),
            locals: self.locals.extended(frame.locals),
            heap: self.heap,
            throws: self.throws,
        }
    }

    /// Joins `other` into `self`, first padding both to their common frame.
    pub fn include(&mut self, other: &Effects) {
        let frame = self.frame().max(other.frame());
        let mine = self.extend_to(frame);
        let theirs = other.extend_to(frame);
        *self = Self {
            args: mine.args.lub(&theirs.args).unwrap_or(mine.args),
            locals: mine.locals.lub(&theirs.locals).unwrap_or(mine.locals),
            heap: mine.heap.max(theirs.heap),
            throws: mine.throws || theirs.throws,
        };
    }
}

impl Lattice for Effects {
    fn lte(&self, other: &Self) -> bool {
        self.args.lte(&other.args)
            && self.locals.lte(&other.locals)
            && self.heap.lte(&other.heap)
            && self.throws.lte(&other.throws)
    }

    fn lub(&self, other: &Self) -> Option<Self> {
        Some(Self {
            args: self.args.lub(&other.args)?,
            locals: self.locals.lub(&other.locals)?,
            heap: self.heap.max(other.heap),
            throws: self.throws || other.throws,
        })
    }

    fn is_bottom(&self) -> bool {
        self.args.is_bottom() && self.locals.is_bottom() && self.heap.is_bottom() && !self.throws
    }

    fn is_top(&self) -> bool {
        self.args.is_top() && self.locals.is_top() && self.heap.is_top() && self.throws
    }

    /// Storage accesses must not conflict, and an exception may not be moved
    /// across a write or another exception.
    fn commutable_with(&self, other: &Self) -> bool {
        if self.throws && (other.throws || !other.is_read_only()) {
            return false;
        }
        if other.throws && !self.is_read_only() {
            return false;
        }
        self.args.commutable_with(&other.args)
            && self.locals.commutable_with(&other.locals)
            && self.heap.commutable_with(&other.heap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Frame = Frame::new(2, 2);

    fn samples() -> Vec<Effects> {
        vec![
            Effects::bottom(FRAME),
            Effects::arg(FRAME, 0, ReadWrite::Read),
            Effects::local(FRAME, 1, ReadWrite::Write),
            Effects::make_heap(FRAME, ReadWrite::Read, false),
            Effects::make_heap(FRAME, ReadWrite::Write, true),
            Effects::make_throws(FRAME),
            Effects::top(FRAME),
        ]
    }

    #[test]
    fn test_lattice_laws() {
        let all = samples();
        for a in &all {
            assert!(a.lte(a));
            for b in &all {
                if a.lte(b) && b.lte(a) {
                    assert_eq!(a, b);
                }
                let joined = a.lub(b).unwrap();
                assert!(a.lte(&joined) && b.lte(&joined));
                assert_eq!(Some(joined.clone()), b.lub(a));
                for c in &all {
                    if a.lte(c) && b.lte(c) {
                        assert!(joined.lte(c));
                    }
                }
            }
        }
    }

    #[test]
    fn test_builders() {
        let args = BitSet::singleton(2, 1);
        let locals = BitSet::singleton(2, 0);

        let e = Effects::make_arg_local(FRAME, &args, &locals, ReadWrite::Write, false);
        assert_eq!(e.args().get(1), ReadWrite::Write);
        assert_eq!(e.locals().get(0), ReadWrite::Write);
        assert_eq!(e.heap(), ReadWrite::None);

        let e = Effects::make_arg_local_heap(FRAME, &args, &locals, ReadWrite::Read, true);
        assert_eq!(e.heap(), ReadWrite::Read);
        assert!(e.may_throw());
        assert!(e.is_read_only());

        let e = Effects::make_throws(FRAME);
        assert!(e.may_throw());
        assert!(e.is_read_only());
        assert!(!e.is_bottom());
    }

    #[test]
    fn test_all_commutable() {
        assert!(Effects::all_commutable(&[]));
        assert!(Effects::all_commutable(&[
            Effects::arg(FRAME, 0, ReadWrite::Read),
            Effects::make_heap(FRAME, ReadWrite::Read, false),
        ]));
        assert!(!Effects::all_commutable(&[
            Effects::bottom(FRAME),
            Effects::make_throws(FRAME),
        ]));
        // Disjoint writes are still rejected.
        assert!(!Effects::all_commutable(&[
            Effects::local(FRAME, 0, ReadWrite::Write),
            Effects::local(FRAME, 1, ReadWrite::Write),
        ]));
    }

    #[test]
    fn test_pairwise_commutable() {
        let read0 = Effects::local(FRAME, 0, ReadWrite::Read);
        let write0 = Effects::local(FRAME, 0, ReadWrite::Write);
        let write1 = Effects::local(FRAME, 1, ReadWrite::Write);
        let throws = Effects::make_throws(FRAME);

        assert!(read0.commutable_with(&read0));
        assert!(!read0.commutable_with(&write0));
        assert!(read0.commutable_with(&write1));
        assert!(write0.commutable_with(&write1));
        assert!(throws.commutable_with(&read0));
        assert!(!throws.commutable_with(&write1));
        assert!(!write1.commutable_with(&throws));
        assert!(!throws.commutable_with(&throws));
    }

    #[test]
    fn test_include_pads_frames() {
        let mut acc = Effects::bottom(Frame::new(1, 1));
        acc.include(&Effects::local(Frame::new(1, 3), 2, ReadWrite::Write));
        assert_eq!(acc.frame(), Frame::new(1, 3));
        assert_eq!(acc.locals().get(2), ReadWrite::Write);

        // The unpadded join has no upper bound.
        assert!(Effects::bottom(Frame::new(1, 1))
            .lub(&Effects::bottom(Frame::new(1, 3)))
            .is_none());
    }
}
