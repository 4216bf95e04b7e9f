//! Shared utility types.

mod bitset;

pub use bitset::{BitSet, BitSetIter};
