//! Expressions, addressable cells and statements.

use crate::ir::{FieldRef, Id, MethodRef};

/// Literal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// The null reference.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// String literal.
    Str(String),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical negation.
    Not,
    /// Bitwise complement.
    BitNot,
}

/// Strict binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Remainder.
    Rem,
    /// Bitwise and.
    BitAnd,
    /// Bitwise or.
    BitOr,
    /// Bitwise exclusive or.
    BitXor,
    /// Left shift.
    Shl,
    /// Right shift.
    Shr,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl BinaryOp {
    /// Returns `true` for operators that raise on a zero divisor.
    #[must_use]
    pub fn may_throw(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }
}

/// Short-circuit operators. The right operand is evaluated conditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
}

/// Addressable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    /// An argument or local.
    Variable(Id),
    /// Instance field of the object `object` evaluates to.
    Field {
        /// Receiver.
        object: Box<Expr>,
        /// Field.
        field: FieldRef,
    },
    /// Static field.
    StaticField(FieldRef),
    /// Array element.
    Element {
        /// Array.
        array: Box<Expr>,
        /// Index.
        index: Box<Expr>,
    },
    /// Target of a managed pointer.
    Deref(Box<Expr>),
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Literal.
    Const(Constant),
    /// Current contents of a cell.
    Read(Cell),
    /// Managed pointer to a cell.
    AddressOf(Cell),
    /// Unary operator application.
    Unary(UnaryOp, Box<Expr>),
    /// Strict binary operator application.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuit operator application.
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : otherwise`.
    Conditional {
        /// Condition, always evaluated.
        cond: Box<Expr>,
        /// Value when `cond` holds.
        then: Box<Expr>,
        /// Value otherwise.
        otherwise: Box<Expr>,
    },
    /// Static call (`receiver` is `None`) or instance call.
    Call {
        /// Callee.
        method: MethodRef,
        /// Receiver, evaluated before the arguments.
        receiver: Option<Box<Expr>>,
        /// Arguments in evaluation order.
        args: Vec<Expr>,
    },
    /// Object creation.
    New {
        /// Constructor.
        ctor: MethodRef,
        /// Constructor arguments in evaluation order.
        args: Vec<Expr>,
    },
    /// Marshal a managed value for an imported (foreign) callee.
    Export(Box<Expr>),
    /// Marshal a value returned by an imported callee back.
    Import(Box<Expr>),
}

impl Expr {
    /// Integer literal.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Const(Constant::Int(value))
    }

    /// Read of a variable.
    #[must_use]
    pub fn read(id: Id) -> Self {
        Self::Read(Cell::Variable(id))
    }

    /// Address of a variable.
    #[must_use]
    pub fn address_of(id: Id) -> Self {
        Self::AddressOf(Cell::Variable(id))
    }

    /// Binary operator application.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary(op, Box::new(left), Box::new(right))
    }

    /// Static call.
    #[must_use]
    pub fn call(method: MethodRef, args: Vec<Expr>) -> Self {
        Self::Call {
            method,
            receiver: None,
            args,
        }
    }

    /// Instance call.
    #[must_use]
    pub fn call_instance(method: MethodRef, receiver: Expr, args: Vec<Expr>) -> Self {
        Self::Call {
            method,
            receiver: Some(Box::new(receiver)),
            args,
        }
    }

    /// Returns the variable this expression reads, if it is a plain variable read.
    #[must_use]
    pub fn as_variable_read(&self) -> Option<Id> {
        match self {
            Self::Read(Cell::Variable(id)) => Some(*id),
            _ => None,
        }
    }
}

/// Statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// Evaluate for effect.
    Expr(Expr),
    /// Store into a cell.
    Assign(Cell, Expr),
    /// Leave the method.
    Return(Option<Expr>),
    /// Raise an exception.
    Throw(Expr),
    /// Two-way branch.
    If {
        /// Condition.
        cond: Expr,
        /// Taken when `cond` holds.
        then: Vec<Stmt>,
        /// Taken otherwise.
        otherwise: Vec<Stmt>,
    },
}

impl Stmt {
    /// Assignment to a variable.
    #[must_use]
    pub fn assign(id: Id, value: Expr) -> Self {
        Self::Assign(Cell::Variable(id), value)
    }

    /// Number of statements including nested ones.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::If {
                then, otherwise, ..
            } => 1 + then.iter().chain(otherwise).map(Stmt::size).sum::<usize>(),
            _ => 1,
        }
    }

    /// Returns `true` if a `return` occurs in or below this statement.
    #[must_use]
    pub fn contains_return(&self) -> bool {
        match self {
            Self::Return(_) => true,
            Self::If {
                then, otherwise, ..
            } => then.iter().chain(otherwise).any(Stmt::contains_return),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_returns() {
        let x = Id::new(0);
        let branch = Stmt::If {
            cond: Expr::read(x),
            then: vec![Stmt::assign(x, Expr::int(1)), Stmt::Return(None)],
            otherwise: vec![],
        };
        assert_eq!(branch.size(), 3);
        assert!(branch.contains_return());
        assert!(!Stmt::Expr(Expr::int(0)).contains_return());
    }

    #[test]
    fn test_variable_read() {
        let x = Id::new(4);
        assert_eq!(Expr::read(x).as_variable_read(), Some(x));
        assert_eq!(Expr::address_of(x).as_variable_read(), None);
        assert!(BinaryOp::Rem.may_throw());
        assert!(!BinaryOp::Add.may_throw());
    }
}
