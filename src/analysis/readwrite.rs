//! Read/write polarity of a storage access.
//!
//! [`ReadWrite`] is the three-point chain `None ⊑ Read ⊑ Write`: a write
//! dominates a read, a read dominates no access. [`ReadWriteVector`] lifts it
//! pointwise over a fixed number of slots (one per argument or local).

use std::fmt;

use crate::analysis::Lattice;

/// Access polarity of a single storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadWrite {
    /// Not accessed.
    #[default]
    None,
    /// May be read, never written.
    Read,
    /// May be written (and read).
    Write,
}

impl ReadWrite {
    /// Returns `true` unless this is [`ReadWrite::Write`].
    #[must_use]
    pub fn is_read_only(self) -> bool {
        self != Self::Write
    }
}

impl Lattice for ReadWrite {
    fn lte(&self, other: &Self) -> bool {
        self <= other
    }

    fn lub(&self, other: &Self) -> Option<Self> {
        Some((*self).max(*other))
    }

    fn is_bottom(&self) -> bool {
        *self == Self::None
    }

    fn is_top(&self) -> bool {
        *self == Self::Write
    }

    /// Reads commute with reads; a write commutes only with no access at all.
    fn commutable_with(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, _) | (_, Self::None) => true,
            (Self::Read, Self::Read) => true,
            _ => false,
        }
    }
}

/// Pointwise [`ReadWrite`] over a fixed number of slots.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ReadWriteVector {
    slots: Vec<ReadWrite>,
}

impl ReadWriteVector {
    /// Creates a vector of `len` slots, all [`ReadWrite::None`].
    #[must_use]
    pub fn bottom(len: usize) -> Self {
        Self {
            slots: vec![ReadWrite::None; len],
        }
    }

    /// Creates a vector of `len` slots, all [`ReadWrite::Write`].
    #[must_use]
    pub fn top(len: usize) -> Self {
        Self {
            slots: vec![ReadWrite::Write; len],
        }
    }

    /// Creates a vector with `rw` in every slot listed by `indices` and `None` elsewhere.
    ///
    /// Indices at or beyond `len` are ignored.
    #[must_use]
    pub fn with(len: usize, indices: impl IntoIterator<Item = usize>, rw: ReadWrite) -> Self {
        let mut result = Self::bottom(len);
        for index in indices {
            if let Some(slot) = result.slots.get_mut(index) {
                *slot = rw;
            }
        }
        result
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the polarity of one slot; out-of-range slots are [`ReadWrite::None`].
    #[must_use]
    pub fn get(&self, index: usize) -> ReadWrite {
        self.slots.get(index).copied().unwrap_or_default()
    }

    /// Returns `true` if no slot is [`ReadWrite::Write`].
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.slots.iter().all(|rw| rw.is_read_only())
    }

    /// Iterates over the slot polarities in index order.
    pub fn iter(&self) -> impl Iterator<Item = ReadWrite> + '_ {
        self.slots.iter().copied()
    }

    /// Returns a copy padded with [`ReadWrite::None`] up to `len` slots.
    #[must_use]
    pub fn extended(&self, len: usize) -> Self {
        let mut slots = self.slots.clone();
        if len > slots.len() {
            slots.resize(len, ReadWrite::None);
        }
        Self { slots }
    }
}

impl fmt::Debug for ReadWriteVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, rw) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            let c = match rw {
                ReadWrite::None => '-',
                ReadWrite::Read => 'r',
                ReadWrite::Write => 'w',
            };
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}

impl Lattice for ReadWriteVector {
    fn lte(&self, other: &Self) -> bool {
        self.len() == other.len() && self.slots.iter().zip(&other.slots).all(|(a, b)| a <= b)
    }

    fn lub(&self, other: &Self) -> Option<Self> {
        if self.len() != other.len() {
            return None;
        }
        Some(Self {
            slots: self
                .slots
                .iter()
                .zip(&other.slots)
                .map(|(a, b)| (*a).max(*b))
                .collect(),
        })
    }

    fn is_bottom(&self) -> bool {
        self.slots.iter().all(ReadWrite::is_bottom)
    }

    fn is_top(&self) -> bool {
        self.slots.iter().all(ReadWrite::is_top)
    }

    fn commutable_with(&self, other: &Self) -> bool {
        self.slots
            .iter()
            .zip(&other.slots)
            .all(|(a, b)| a.commutable_with(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ReadWrite; 3] = [ReadWrite::None, ReadWrite::Read, ReadWrite::Write];

    #[test]
    fn test_scalar_chain() {
        assert!(ReadWrite::None.lte(&ReadWrite::Read));
        assert!(ReadWrite::Read.lte(&ReadWrite::Write));
        assert!(!ReadWrite::Write.lte(&ReadWrite::Read));

        for a in ALL {
            assert!(a.lte(&a));
            for b in ALL {
                let joined = a.lub(&b).unwrap();
                assert!(a.lte(&joined) && b.lte(&joined));
                assert_eq!(joined, if a.lte(&b) { b } else { a });
            }
        }
    }

    #[test]
    fn test_scalar_commutable() {
        assert!(ReadWrite::Read.commutable_with(&ReadWrite::Read));
        assert!(ReadWrite::Write.commutable_with(&ReadWrite::None));
        assert!(!ReadWrite::Write.commutable_with(&ReadWrite::Read));
        assert!(!ReadWrite::Read.commutable_with(&ReadWrite::Write));
        assert!(!ReadWrite::Write.commutable_with(&ReadWrite::Write));
    }

    #[test]
    fn test_vector_pointwise() {
        let a = ReadWriteVector::with(3, [0], ReadWrite::Write);
        let b = ReadWriteVector::with(3, [0, 2], ReadWrite::Read);

        let joined = a.lub(&b).unwrap();
        assert_eq!(joined.get(0), ReadWrite::Write);
        assert_eq!(joined.get(1), ReadWrite::None);
        assert_eq!(joined.get(2), ReadWrite::Read);
        assert!(a.lte(&joined));
        assert!(b.lte(&joined));
        assert!(!a.lte(&b));
        assert!(!b.lte(&a));

        assert!(!joined.is_read_only());
        assert!(b.is_read_only());
        assert!(ReadWriteVector::bottom(3).is_bottom());
        assert!(ReadWriteVector::top(3).is_top());
    }

    #[test]
    fn test_vector_shape_mismatch() {
        let a = ReadWriteVector::bottom(2);
        let b = ReadWriteVector::bottom(3);
        assert!(a.lub(&b).is_none());
        assert_eq!(a.extended(3), b);
    }
}
