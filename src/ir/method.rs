//! Method bodies.

use crate::ir::{Expr, Id, MethodRef, Stmt, VariableTable};

/// The IR of one method: signature reference, variables and statements.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// The method this body implements.
    pub method: MethodRef,
    /// Implemented outside managed code; calls to it need interop marshalling.
    pub is_import: bool,
    /// Arguments and locals.
    pub variables: VariableTable,
    /// Top-level statements.
    pub statements: Vec<Stmt>,
}

impl MethodBody {
    /// Creates a managed method body.
    #[must_use]
    pub fn new(method: MethodRef, variables: VariableTable, statements: Vec<Stmt>) -> Self {
        Self {
            method,
            is_import: false,
            variables,
            statements,
        }
    }

    /// Returns the formal parameters in order, receiver first for instance methods.
    #[must_use]
    pub fn parameters(&self) -> Vec<Id> {
        self.variables.arguments().collect()
    }

    /// Number of statements including nested ones.
    #[must_use]
    pub fn size(&self) -> usize {
        self.statements.iter().map(Stmt::size).sum()
    }

    /// Returns `e` if the body is exactly `return e`.
    #[must_use]
    pub fn single_return(&self) -> Option<&Expr> {
        match self.statements.as_slice() {
            [Stmt::Return(Some(e))] => Some(e),
            _ => None,
        }
    }

    /// Splits a straight-line body into its leading statements and the
    /// trailing return expression.
    ///
    /// Returns `None` if a `return` occurs anywhere but as the last top-level
    /// statement, since such a body cannot be spliced into a caller.
    #[must_use]
    pub fn split_trailing_return(&self) -> Option<(&[Stmt], Option<&Expr>)> {
        let (init, last) = match self.statements.split_last() {
            Some((Stmt::Return(value), init)) => (init, value.as_ref()),
            _ => (self.statements.as_slice(), None),
        };
        if init.iter().any(Stmt::contains_return) {
            return None;
        }
        Some((init, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{MethodBuilder, TypeRef};

    fn method() -> MethodRef {
        MethodRef::new_static(TypeRef::new("app", "Program"), "f", 1)
    }

    #[test]
    fn test_shapes() {
        let int = TypeRef::new("mscorlib", "System.Int32");
        let mut b = MethodBuilder::new(method());
        let a = b.arg("a", int.clone());
        b.push(Stmt::Return(Some(Expr::read(a))));
        let body = b.build();

        assert_eq!(body.single_return(), Some(&Expr::read(a)));
        let (init, ret) = body.split_trailing_return().unwrap();
        assert!(init.is_empty());
        assert_eq!(ret, Some(&Expr::read(a)));
        assert_eq!(body.parameters(), vec![a]);
    }

    #[test]
    fn test_early_return_is_not_splittable() {
        let int = TypeRef::new("mscorlib", "System.Int32");
        let mut b = MethodBuilder::new(method());
        let a = b.arg("a", int);
        b.push(Stmt::If {
            cond: Expr::read(a),
            then: vec![Stmt::Return(Some(Expr::int(0)))],
            otherwise: vec![],
        });
        b.push(Stmt::Return(Some(Expr::int(1))));
        let body = b.build();

        assert!(body.split_trailing_return().is_none());
        assert!(body.single_return().is_none());
        assert_eq!(body.size(), 3);
    }
}
