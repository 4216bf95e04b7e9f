//! Abstract interpretation framework.
//!
//! All domains implement the [`Lattice`] trait and have finite height, so
//! fixed-point iteration with [`lfp`] terminates without widening.
//!
//! - [`lattice`](Lattice) - the trait, the boolean domain and [`lfp`]
//! - [`ReadWrite`], [`ReadWriteVector`] - access polarity per slot
//! - [`PointsTo`] - what a pointer may reference
//! - [`Effects`] - what evaluating a term may read, write or raise
//! - [`Usage`] - definite/possible reference counts
//! - [`LogicArena`] - union-find cells for incremental unification

mod effects;
mod lattice;
mod logicvar;
mod pointsto;
mod readwrite;
mod usage;

pub use effects::Effects;
pub use lattice::{lfp, Lattice};
pub use logicvar::{LogicArena, LogicVar};
pub use pointsto::{Frame, PointsTo};
pub use readwrite::{ReadWrite, ReadWriteVector};
pub use usage::{Usage, UsageKind, POSSIBLE};
