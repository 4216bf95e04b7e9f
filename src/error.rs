use thiserror::Error;

use crate::ir::Id;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// None of these errors describe a property of the program being compiled. They signal that the
/// driver handed the core an inconsistent rewriting context or IR, and are meant to be consumed by
/// the surrounding compiler, which decides whether to abort the compilation or to skip a method.
///
/// Note that an illegal inlining is *not* an error: a failed [`crate::compiler::CallContext`]
/// simply leaves the call site un-inlined.
///
/// # Error Categories
///
/// ## Usage Errors
/// - [`Error::LogicVarBound`] - A logic variable was bound twice
/// - [`Error::NoStatementBuffer`] - A statement was emitted in an expression-only context
///
/// ## Domain Errors
/// - [`Error::NoUpperBound`] - Two lattice elements of incompatible shape were joined
///
/// ## IR Errors
/// - [`Error::UnknownVariable`] - An identifier is missing from the variable table
/// - [`Error::UnknownMethod`] - No body is registered for a method
/// - [`Error::Malformed`] - Structurally inconsistent IR
///
/// # Examples
///
/// ```rust
/// use ilopt::{analysis::LogicArena, Error};
///
/// let mut arena = LogicArena::new();
/// let var = arena.bound(1);
/// match arena.bind(var, 2) {
///     Err(Error::LogicVarBound) => {}
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A logic variable whose representative already holds a value was bound again.
    ///
    /// Binding is a one-shot operation; merging two facts goes through
    /// [`crate::analysis::LogicArena::unify`] instead.
    #[error("Logic variable is already bound")]
    LogicVarBound,

    /// A statement was added to a simplifier context that has no open statement buffer.
    ///
    /// Expression-only contexts must fail rather than silently drop a side effect.
    #[error("No statement buffer is open in this context")]
    NoStatementBuffer,

    /// Two lattice elements have no least upper bound.
    ///
    /// The domains in this crate are bounded, so this only happens when elements built for
    /// different frames (e.g. index sets of different capacity) are joined.
    #[error("Lattice elements have no upper bound")]
    NoUpperBound,

    /// An identifier was not found in the variable table.
    #[error("Unknown variable - {0}")]
    UnknownVariable(Id),

    /// No method body is registered for the given method.
    #[error("Unknown method - {0}")]
    UnknownMethod(String),

    /// The IR handed to the core is inconsistent.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
