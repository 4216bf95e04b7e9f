//! Lattice trait for abstract interpretation.
//!
//! A lattice defines how abstract values are ordered and how facts discovered
//! along different paths combine. Every domain in this crate is a bounded
//! join semi-lattice of finite height, which is what makes [`lfp`] terminate.
//!
//! # Lattice Theory Background
//!
//! - **Partial Order**: Elements can be compared (`lte`)
//! - **Join (∨)**: Least upper bound of two elements (`lub`)
//! - **Bottom (⊥)**: Least element ("no information" or "unreachable")
//! - **Top (⊤)**: Greatest element ("no constraint")
//!
//! # Domains
//!
//! | Domain | Carrier | Bottom | Top |
//! |--------|---------|--------|-----|
//! | Boolean | `bool` | `false` | `true` |
//! | Bounded powerset | [`BitSet`] | `{}` | `[0, n)` |
//! | Read/write | [`ReadWrite`](crate::analysis::ReadWrite) | `None` | `Write` |
//! | Read/write vector | [`ReadWriteVector`](crate::analysis::ReadWriteVector) | all `None` | all `Write` |
//! | Points-to | [`PointsTo`](crate::analysis::PointsTo) | `({}, {}, false)` | full sets, heap |
//! | Effects | [`Effects`](crate::analysis::Effects) | no effect | everything |

use std::fmt::Debug;

use crate::{utils::BitSet, Error, Result};

/// A bounded join semi-lattice.
///
/// The join must satisfy:
///
/// - **Idempotent**: `x.lub(x) = x`
/// - **Commutative**: `x.lub(y) = y.lub(x)`
/// - **Associative**: `x.lub(y.lub(z)) = (x.lub(y)).lub(z)`
/// - **Least**: `x.lub(y)` is `lte` every `z` with `x.lte(z)` and `y.lte(z)`
///
/// # Examples
///
/// ```rust
/// use ilopt::analysis::{Lattice, ReadWrite};
///
/// assert!(ReadWrite::Read.lte(&ReadWrite::Write));
/// assert_eq!(ReadWrite::None.lub(&ReadWrite::Read), Some(ReadWrite::Read));
/// ```
pub trait Lattice: Clone + Debug + PartialEq {
    /// Returns `true` if `self ⊑ other`.
    fn lte(&self, other: &Self) -> bool;

    /// Computes the least upper bound of two elements.
    ///
    /// Returns `None` when no upper bound exists. All domains here are bounded,
    /// so this only happens for elements built for incompatible shapes.
    #[must_use]
    fn lub(&self, other: &Self) -> Option<Self>;

    /// Returns `true` if this is the bottom element.
    fn is_bottom(&self) -> bool;

    /// Returns `true` if this is the top element.
    fn is_top(&self) -> bool;

    /// Returns `true` if the effects denoted by `self` and `other` do not interfere.
    fn commutable_with(&self, other: &Self) -> bool;

    /// Joins `other` into `self` in place.
    ///
    /// `self` is left untouched when the join equals `self`; otherwise it is
    /// replaced and `changed` is set. The flag is never cleared, so one flag
    /// can be shared across a whole round of fixed-point propagation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoUpperBound`] if the two elements have no join.
    fn lub_changed(&mut self, other: &Self, changed: &mut bool) -> Result<()> {
        if other.lte(self) {
            return Ok(());
        }
        *self = self.lub(other).ok_or(Error::NoUpperBound)?;
        *changed = true;
        Ok(())
    }
}

/// Computes a least fixed point by iteration from `start`.
///
/// Applies `step` until `step(x) ⊑ x` and returns that `x`. Each round joins
/// the step result into the current element, so the sequence is ascending;
/// termination follows from the finite height of the domain. `step` must be
/// monotone.
///
/// # Errors
///
/// Returns [`Error::NoUpperBound`] if `step` produces an element that cannot be
/// joined with the current one.
///
/// # Examples
///
/// ```rust
/// use ilopt::{analysis::lfp, utils::BitSet};
///
/// // Everything reachable from 0 in the chain 0 -> 1 -> 2 -> 3.
/// let reach = lfp(BitSet::singleton(4, 0), |set| {
///     let mut next = set.clone();
///     for i in set.iter().filter(|&i| i + 1 < 4) {
///         next.insert(i + 1);
///     }
///     next
/// })?;
/// assert!(reach.is_full());
/// # Ok::<(), ilopt::Error>(())
/// ```
pub fn lfp<L, F>(start: L, mut step: F) -> Result<L>
where
    L: Lattice,
    F: FnMut(&L) -> L,
{
    let mut current = start;
    loop {
        let next = step(&current);
        if next.lte(&current) {
            return Ok(current);
        }
        current = current.lub(&next).ok_or(Error::NoUpperBound)?;
    }
}

impl Lattice for bool {
    fn lte(&self, other: &Self) -> bool {
        !*self || *other
    }

    fn lub(&self, other: &Self) -> Option<Self> {
        Some(*self || *other)
    }

    fn is_bottom(&self) -> bool {
        !*self
    }

    fn is_top(&self) -> bool {
        *self
    }

    /// Two raised flags (e.g. two possible exceptions) cannot be swapped.
    fn commutable_with(&self, other: &Self) -> bool {
        !(*self && *other)
    }
}

impl Lattice for BitSet {
    fn lte(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }

    fn lub(&self, other: &Self) -> Option<Self> {
        if self.len() != other.len() {
            return None;
        }
        let mut result = self.clone();
        result.union_with(other);
        Some(result)
    }

    fn is_bottom(&self) -> bool {
        self.is_empty()
    }

    fn is_top(&self) -> bool {
        self.is_full()
    }

    fn commutable_with(&self, other: &Self) -> bool {
        self.is_disjoint(other)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn sets() -> Vec<BitSet> {
        let mut two = BitSet::singleton(3, 0);
        two.insert(2);
        vec![
            BitSet::new(3),
            BitSet::singleton(3, 0),
            BitSet::singleton(3, 1),
            two,
            BitSet::full(3),
        ]
    }

    #[test]
    fn test_bool_order() {
        assert!(false.lte(&true));
        assert!(!true.lte(&false));
        assert_eq!(false.lub(&true), Some(true));
        assert!(false.is_bottom());
        assert!(true.is_top());
        assert!(true.commutable_with(&false));
        assert!(!true.commutable_with(&true));
    }

    #[test]
    fn test_bitset_is_powerset_lattice() {
        let all = sets();
        for a in &all {
            assert!(a.lte(a), "reflexive");
            for b in &all {
                if a.lte(b) && b.lte(a) {
                    assert_eq!(a, b, "antisymmetric");
                }
                let joined = a.lub(b).unwrap();
                assert!(a.lte(&joined) && b.lte(&joined));
                let union: BTreeSet<usize> = a.iter().chain(b.iter()).collect();
                assert_eq!(joined.iter().collect::<BTreeSet<_>>(), union);
                for c in &all {
                    if a.lte(c) && b.lte(c) {
                        assert!(joined.lte(c), "least");
                    }
                }
            }
        }
    }

    #[test]
    fn test_bitset_capacity_mismatch() {
        let a = BitSet::new(2);
        let b = BitSet::new(3);
        assert!(a.lub(&b).is_none());
        assert!(!a.lte(&b));

        let mut c = a.clone();
        let mut changed = false;
        assert!(matches!(
            c.lub_changed(&BitSet::full(3), &mut changed),
            Err(Error::NoUpperBound)
        ));
        assert!(!changed);
    }

    #[test]
    fn test_lub_changed_flag() {
        let mut changed = false;
        let mut a = BitSet::singleton(4, 1);

        a.lub_changed(&BitSet::singleton(4, 1), &mut changed).unwrap();
        assert!(!changed);

        a.lub_changed(&BitSet::singleton(4, 3), &mut changed).unwrap();
        assert!(changed);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 3]);

        // Once set, the flag stays set.
        a.lub_changed(&BitSet::new(4), &mut changed).unwrap();
        assert!(changed);
    }

    #[test]
    fn test_lfp_stops_at_post_fixed_point() {
        let mut rounds = 0;
        let result = lfp(false, |x| {
            rounds += 1;
            !*x || *x
        })
        .unwrap();
        assert!(result);
        assert_eq!(rounds, 2);
    }
}
