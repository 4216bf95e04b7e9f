//! Logic variables for incremental unification.
//!
//! A logic variable is a union-find cell that is either unbound, bound to a
//! value, or linked to another variable. Linked chains are flattened by path
//! compression, so from the outside a variable always looks like "this
//! representative is bound to V" or "this representative is unbound".
//!
//! Cells live in a flat [`LogicArena`] and are referenced by index
//! ([`LogicVar`]), so chains never form ownership cycles. The index doubles as
//! the variable's debug id; there is no process-wide counter.
//!
//! # Examples
//!
//! ```rust
//! use ilopt::analysis::LogicArena;
//!
//! let mut arena = LogicArena::new();
//! let a = arena.fresh();
//! let b = arena.bound(7);
//!
//! let mut changed = false;
//! arena.unify(a, b, |_, _, _| Ok(()), &mut changed)?;
//!
//! assert_eq!(arena.follow(a), arena.follow(b));
//! assert_eq!(arena.value(a), Some(&7));
//! # Ok::<(), ilopt::Error>(())
//! ```

use std::fmt;

use crate::{Error, Result};

/// Handle to a cell in a [`LogicArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicVar(usize);

impl LogicVar {
    /// Returns the arena index (and debug id) of this variable.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for LogicVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Binding<T> {
    Unbound,
    Bound(T),
    Link(LogicVar),
}

/// Flat storage for logic variables holding values of type `T`.
///
/// Each fixed-point computation owns its own arena; nothing is shared between
/// threads.
#[derive(Debug, Clone)]
pub struct LogicArena<T> {
    cells: Vec<Binding<T>>,
}

impl<T> Default for LogicArena<T> {
    fn default() -> Self {
        Self { cells: Vec::new() }
    }
}

impl<T> LogicArena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of variables ever created in this arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no variable has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Creates an unbound variable.
    pub fn fresh(&mut self) -> LogicVar {
        self.cells.push(Binding::Unbound);
        LogicVar(self.cells.len() - 1)
    }

    /// Creates a variable already bound to `value`.
    pub fn bound(&mut self, value: T) -> LogicVar {
        self.cells.push(Binding::Bound(value));
        LogicVar(self.cells.len() - 1)
    }

    /// Returns the representative of `var`, compressing the chain behind it.
    pub fn follow(&mut self, var: LogicVar) -> LogicVar {
        let mut root = var;
        while let Binding::Link(next) = self.cells[root.0] {
            root = next;
        }

        let mut current = var;
        while let Binding::Link(next) = self.cells[current.0] {
            if next == root {
                break;
            }
            self.cells[current.0] = Binding::Link(root);
            current = next;
        }
        root
    }

    /// Returns `true` if the representative of `var` holds a value.
    pub fn is_bound(&mut self, var: LogicVar) -> bool {
        let root = self.follow(var);
        matches!(self.cells[root.0], Binding::Bound(_))
    }

    /// Returns the value bound to the representative of `var`, if any.
    pub fn value(&mut self, var: LogicVar) -> Option<&T> {
        let root = self.follow(var);
        match &self.cells[root.0] {
            Binding::Bound(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value bound to the representative of `var` for in-place updates.
    pub fn value_mut(&mut self, var: LogicVar) -> Option<&mut T> {
        let root = self.follow(var);
        match &mut self.cells[root.0] {
            Binding::Bound(value) => Some(value),
            _ => None,
        }
    }

    /// Binds the representative of `var` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LogicVarBound`] if the representative is already bound.
    pub fn bind(&mut self, var: LogicVar, value: T) -> Result<()> {
        let root = self.follow(var);
        match self.cells[root.0] {
            Binding::Bound(_) => Err(Error::LogicVarBound),
            _ => {
                self.cells[root.0] = Binding::Bound(value);
                Ok(())
            }
        }
    }

    /// Merges the classes of `a` and `b`.
    ///
    /// Nothing happens if both already share a representative. If both are
    /// bound, `reconcile` receives the surviving value (mutable) and the
    /// absorbed one, and may set `changed`; afterwards `b`'s representative is
    /// chained to `a`'s. If only one is bound, the unbound side is chained to
    /// the bound one. Any merge of two distinct classes sets `changed`.
    ///
    /// # Errors
    ///
    /// Propagates the error of `reconcile`, in which case both classes are
    /// left as they were.
    pub fn unify<F>(&mut self, a: LogicVar, b: LogicVar, reconcile: F, changed: &mut bool) -> Result<()>
    where
        F: FnOnce(&mut T, &T, &mut bool) -> Result<()>,
    {
        let ra = self.follow(a);
        let rb = self.follow(b);
        if ra == rb {
            return Ok(());
        }

        let b_cell = std::mem::replace(&mut self.cells[rb.0], Binding::Unbound);
        let b_cell = match b_cell {
            Binding::Bound(vb) => match &mut self.cells[ra.0] {
                Binding::Bound(va) => {
                    if let Err(e) = reconcile(va, &vb, changed) {
                        self.cells[rb.0] = Binding::Bound(vb);
                        return Err(e);
                    }
                    Binding::Link(ra)
                }
                _ => {
                    self.cells[ra.0] = Binding::Link(rb);
                    Binding::Bound(vb)
                }
            },
            _ => Binding::Link(ra),
        };
        self.cells[rb.0] = b_cell;
        *changed = true;
        Ok(())
    }
}
