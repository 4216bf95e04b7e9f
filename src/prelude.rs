//! # ilopt Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the ilopt library. Import this module to get quick access to everything needed to
//! build method bodies and simplify them.
//!
//! ```rust
//! use ilopt::prelude::*;
//!
//! let context = CompilerContext::new();
//! assert!(context.is_empty());
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all ilopt operations
pub use crate::Error;

/// The result type used throughout ilopt
pub use crate::Result;

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Entity references
pub use crate::ir::{AssemblyName, FieldRef, MethodRef, TypeRef};

/// Variables and their declarations
pub use crate::ir::{Id, Slot, Variable, VariableFlags, VariableTable};

/// Expressions, cells and statements
pub use crate::ir::{BinaryOp, Cell, Constant, Expr, LogicalOp, Stmt, UnaryOp};

/// Method bodies and their construction
pub use crate::ir::{MethodBody, MethodBuilder};

// ================================================================================================
// Analysis Domains
// ================================================================================================

/// Lattice abstraction and fixed points
pub use crate::analysis::{lfp, Lattice};

/// Effects and points-to domains
pub use crate::analysis::{Effects, Frame, PointsTo, ReadWrite, ReadWriteVector};

/// Usage tracking
pub use crate::analysis::{Usage, UsageKind, POSSIBLE};

/// Logic variables
pub use crate::analysis::{LogicArena, LogicVar};

// ================================================================================================
// Simplification
// ================================================================================================

/// Multi-method driver
pub use crate::compiler::CompilerContext;

/// Single-method pass and its rewriting context
pub use crate::compiler::{CallContext, Simplified, Simplifier, SimplifierContext};

/// Inlining oracle and callee lookup
pub use crate::compiler::{DefaultPolicy, InlinePolicy, MethodRepository};

/// Configuration
pub use crate::compiler::SimplifierConfig;

/// Diagnostics
pub use crate::compiler::{Event, EventKind, EventLog};
