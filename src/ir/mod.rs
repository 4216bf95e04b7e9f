//! Intermediate representation consumed and produced by the simplifier.
//!
//! Method bodies arrive here after control flow has been structured and
//! liveness has been inferred: a [`MethodBody`] is a [`VariableTable`] plus a
//! tree of [`Stmt`]s over [`Expr`]s and addressable [`Cell`]s. Besides the
//! data types this module answers the queries the optimizer needs:
//!
//! - [`Expr::accum_effects`] / [`Stmt::accum_effects`] - abstract side effects
//! - [`Expr::points_to`] - abstract pointer targets
//! - [`Expr::is_value`] - freely duplicable and movable terms
//! - [`Expr::usage`] / [`MethodBody::usage`] - definite/possible references

mod builder;
mod effects;
mod expr;
mod method;
mod types;
mod usage;
mod variable;

pub use builder::MethodBuilder;
pub use expr::{BinaryOp, Cell, Constant, Expr, LogicalOp, Stmt, UnaryOp};
pub use method::MethodBody;
pub use types::{AssemblyName, FieldRef, MethodRef, TypeRef};
pub use variable::{Id, Slot, Variable, VariableFlags, VariableTable};
