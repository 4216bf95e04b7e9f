//! Points-to domain.
//!
//! A [`PointsTo`] value approximates the storage a pointer-typed value may
//! reference: a set of argument slots, a set of local slots, and "somewhere in
//! the heap". Values that are not pointers are exactly the bottom element.
//!
//! Dereferencing a pointer touches whatever it may point to, which is how a
//! points-to value turns into [`Effects`] via [`PointsTo::read_effect`] and
//! [`PointsTo::write_effect`].

use crate::{
    analysis::{Effects, Lattice, ReadWrite, ReadWriteVector},
    utils::BitSet,
};

/// Number of argument and local slots of the method being analyzed.
///
/// Every points-to and effects value is built for one frame; elements of
/// different frames have no join until padded with `extend_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Frame {
    /// Number of argument slots (including the receiver of instance methods).
    pub args: usize,
    /// Number of local slots.
    pub locals: usize,
}

impl Frame {
    /// Creates a frame with the given slot counts.
    #[must_use]
    pub const fn new(args: usize, locals: usize) -> Self {
        Self { args, locals }
    }

    /// Returns the smallest frame covering both `self` and `other`.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            args: self.args.max(other.args),
            locals: self.locals.max(other.locals),
        }
    }
}

/// Abstract pointer target: `(argument set, local set, heap flag)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointsTo {
    args: BitSet,
    locals: BitSet,
    heap: bool,
}

impl PointsTo {
    /// Points nowhere; the value of any non-pointer expression.
    #[must_use]
    pub fn bottom(frame: Frame) -> Self {
        Self {
            args: BitSet::new(frame.args),
            locals: BitSet::new(frame.locals),
            heap: false,
        }
    }

    /// May point anywhere.
    #[must_use]
    pub fn top(frame: Frame) -> Self {
        Self {
            args: BitSet::full(frame.args),
            locals: BitSet::full(frame.locals),
            heap: true,
        }
    }

    /// Points exactly at argument `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the frame.
    #[must_use]
    pub fn arg(frame: Frame, index: usize) -> Self {
        Self {
            args: BitSet::singleton(frame.args, index),
            ..Self::bottom(frame)
        }
    }

    /// Points exactly at local `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the frame.
    #[must_use]
    pub fn local(frame: Frame, index: usize) -> Self {
        Self {
            locals: BitSet::singleton(frame.locals, index),
            ..Self::bottom(frame)
        }
    }

    /// Points somewhere in the heap.
    #[must_use]
    pub fn heap(frame: Frame) -> Self {
        Self {
            heap: true,
            ..Self::bottom(frame)
        }
    }

    /// Returns the frame this value was built for.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::new(self.args.len(), self.locals.len())
    }

    /// Returns the argument slots this value may point at.
    #[must_use]
    pub fn args(&self) -> &BitSet {
        &self.args
    }

    /// Returns the local slots this value may point at.
    #[must_use]
    pub fn locals(&self) -> &BitSet {
        &self.locals
    }

    /// Returns `true` if this value may point into the heap.
    #[must_use]
    pub fn may_point_to_heap(&self) -> bool {
        self.heap
    }

    /// Effects of reading through this pointer.
    #[must_use]
    pub fn read_effect(&self) -> Effects {
        self.effect(ReadWrite::Read)
    }

    /// Effects of writing through this pointer.
    #[must_use]
    pub fn write_effect(&self) -> Effects {
        self.effect(ReadWrite::Write)
    }

    fn effect(&self, rw: ReadWrite) -> Effects {
        Effects::new(
            ReadWriteVector::with(self.args.len(), self.args.iter(), rw),
            ReadWriteVector::with(self.locals.len(), self.locals.iter(), rw),
            if self.heap { rw } else { ReadWrite::None },
            false,
        )
    }

    /// Returns a copy padded to `frame`.
    #[must_use]
    pub fn extend_to(&self, frame: Frame) -> Self {
        Self {
            args: self.args.extended(frame.args),
            locals: self.locals.extended(frame.locals),
            heap: self.heap,
        }
    }
}

impl Lattice for PointsTo {
    fn lte(&self, other: &Self) -> bool {
        self.args.lte(&other.args) && self.locals.lte(&other.locals) && self.heap.lte(&other.heap)
    }

    fn lub(&self, other: &Self) -> Option<Self> {
        Some(Self {
            args: self.args.lub(&other.args)?,
            locals: self.locals.lub(&other.locals)?,
            heap: self.heap || other.heap,
        })
    }

    fn is_bottom(&self) -> bool {
        self.args.is_bottom() && self.locals.is_bottom() && !self.heap
    }

    fn is_top(&self) -> bool {
        self.args.is_top() && self.locals.is_top() && self.heap
    }

    /// Two pointers commute when they cannot alias.
    fn commutable_with(&self, other: &Self) -> bool {
        self.args.commutable_with(&other.args)
            && self.locals.commutable_with(&other.locals)
            && self.heap.commutable_with(&other.heap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Frame = Frame::new(2, 3);

    #[test]
    fn test_constructors() {
        assert!(PointsTo::bottom(FRAME).is_bottom());
        assert!(PointsTo::top(FRAME).is_top());

        let a1 = PointsTo::arg(FRAME, 1);
        assert!(a1.args().contains(1));
        assert!(a1.locals().is_empty());
        assert!(!a1.may_point_to_heap());

        let h = PointsTo::heap(FRAME);
        assert!(h.may_point_to_heap());
        assert!(h.args().is_empty());
    }

    #[test]
    fn test_join_is_componentwise() {
        let joined = PointsTo::arg(FRAME, 0)
            .lub(&PointsTo::local(FRAME, 2))
            .unwrap()
            .lub(&PointsTo::heap(FRAME))
            .unwrap();
        assert!(joined.args().contains(0));
        assert!(joined.locals().contains(2));
        assert!(joined.may_point_to_heap());
        assert!(PointsTo::arg(FRAME, 0).lte(&joined));
        assert!(!joined.lte(&PointsTo::arg(FRAME, 0)));
    }

    #[test]
    fn test_read_write_effects_match_targets() {
        let p = PointsTo::arg(FRAME, 1)
            .lub(&PointsTo::local(FRAME, 0))
            .unwrap()
            .lub(&PointsTo::heap(FRAME))
            .unwrap();

        let read = p.read_effect();
        assert_eq!(read.args().get(1), ReadWrite::Read);
        assert_eq!(read.args().get(0), ReadWrite::None);
        assert_eq!(read.locals().get(0), ReadWrite::Read);
        assert_eq!(read.locals().get(1), ReadWrite::None);
        assert_eq!(read.heap(), ReadWrite::Read);
        assert!(!read.may_throw());
        assert!(read.is_read_only());

        let write = p.write_effect();
        assert_eq!(write.args().get(1), ReadWrite::Write);
        assert_eq!(write.locals().get(0), ReadWrite::Write);
        assert_eq!(write.heap(), ReadWrite::Write);
        assert!(!write.may_throw());

        let local_only = PointsTo::local(FRAME, 2).write_effect();
        assert_eq!(local_only.heap(), ReadWrite::None);
        assert!(local_only.args().is_bottom());
    }

    #[test]
    fn test_bottom_has_no_effect() {
        assert!(PointsTo::bottom(FRAME).read_effect().is_bottom());
        assert!(PointsTo::bottom(FRAME).write_effect().is_bottom());
    }

    #[test]
    fn test_aliasing() {
        assert!(PointsTo::arg(FRAME, 0).commutable_with(&PointsTo::arg(FRAME, 1)));
        assert!(!PointsTo::heap(FRAME).commutable_with(&PointsTo::heap(FRAME)));
    }
}
