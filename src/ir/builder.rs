//! Fluent construction of method bodies.
//!
//! [`MethodBuilder`] declares variables, collects statements and, on
//! [`build`](MethodBuilder::build), derives the [`VariableFlags`] the
//! analyses rely on (`READ` and `ADDRESS_TAKEN`) from the statements.
//!
//! # Examples
//!
//! ```rust
//! use ilopt::ir::{BinaryOp, Expr, MethodBuilder, MethodRef, Stmt, TypeRef};
//!
//! let int = TypeRef::new("mscorlib", "System.Int32");
//! let add = MethodRef::new_static(TypeRef::new("app", "Math"), "Add", 2);
//!
//! let mut builder = MethodBuilder::new(add);
//! let a = builder.arg("a", int.clone());
//! let b = builder.arg("b", int);
//! builder.push(Stmt::Return(Some(Expr::binary(
//!     BinaryOp::Add,
//!     Expr::read(a),
//!     Expr::read(b),
//! ))));
//!
//! let body = builder.build();
//! assert_eq!(body.parameters(), vec![a, b]);
//! ```

use crate::ir::{
    Cell, Expr, Id, MethodBody, MethodRef, Stmt, TypeRef, VariableFlags, VariableTable,
};

/// Builder for [`MethodBody`].
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    method: MethodRef,
    is_import: bool,
    variables: VariableTable,
    statements: Vec<Stmt>,
}

impl MethodBuilder {
    /// Starts a managed method body.
    #[must_use]
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            is_import: false,
            variables: VariableTable::new(),
            statements: Vec::new(),
        }
    }

    /// Marks the method as imported.
    #[must_use]
    pub fn import(mut self) -> Self {
        self.is_import = true;
        self
    }

    /// Declares the next formal parameter.
    pub fn arg(&mut self, name: &str, ty: TypeRef) -> Id {
        self.variables.declare_argument(name, ty)
    }

    /// Declares a local.
    pub fn local(&mut self, name: &str, ty: TypeRef) -> Id {
        self.variables
            .declare_named_local(name, ty, VariableFlags::empty())
    }

    /// Appends a statement.
    pub fn push(&mut self, stmt: Stmt) -> &mut Self {
        self.statements.push(stmt);
        self
    }

    /// Finishes the body, deriving variable flags from the statements.
    #[must_use]
    pub fn build(self) -> MethodBody {
        let mut variables = self.variables;
        let mut uses = Vec::new();
        for stmt in &self.statements {
            collect_stmt(stmt, &mut uses);
        }
        for (id, flags) in uses {
            // Ids come from this builder; foreign ones are left for the analyses to reject.
            let _ = variables.mark(id, flags);
        }

        MethodBody {
            method: self.method,
            is_import: self.is_import,
            variables,
            statements: self.statements,
        }
    }
}

fn collect_stmt(stmt: &Stmt, uses: &mut Vec<(Id, VariableFlags)>) {
    match stmt {
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Return(Some(e)) => collect_expr(e, uses),
        Stmt::Return(None) => {}
        Stmt::Assign(cell, value) => {
            collect_cell_operands(cell, uses);
            collect_expr(value, uses);
        }
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            collect_expr(cond, uses);
            for s in then.iter().chain(otherwise) {
                collect_stmt(s, uses);
            }
        }
    }
}

fn collect_cell_operands(cell: &Cell, uses: &mut Vec<(Id, VariableFlags)>) {
    match cell {
        Cell::Variable(_) | Cell::StaticField(_) => {}
        Cell::Field { object, .. } => collect_expr(object, uses),
        Cell::Element { array, index } => {
            collect_expr(array, uses);
            collect_expr(index, uses);
        }
        Cell::Deref(pointer) => collect_expr(pointer, uses),
    }
}

fn collect_expr(expr: &Expr, uses: &mut Vec<(Id, VariableFlags)>) {
    match expr {
        Expr::Const(_) => {}
        Expr::Read(cell) => {
            if let Cell::Variable(id) = cell {
                uses.push((*id, VariableFlags::READ));
            }
            collect_cell_operands(cell, uses);
        }
        Expr::AddressOf(cell) => {
            if let Cell::Variable(id) = cell {
                uses.push((*id, VariableFlags::ADDRESS_TAKEN));
            }
            collect_cell_operands(cell, uses);
        }
        Expr::Unary(_, e) | Expr::Export(e) | Expr::Import(e) => collect_expr(e, uses),
        Expr::Binary(_, l, r) | Expr::Logical(_, l, r) => {
            collect_expr(l, uses);
            collect_expr(r, uses);
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            collect_expr(cond, uses);
            collect_expr(then, uses);
            collect_expr(otherwise, uses);
        }
        Expr::Call { receiver, args, .. } => {
            if let Some(r) = receiver {
                collect_expr(r, uses);
            }
            for a in args {
                collect_expr(a, uses);
            }
        }
        Expr::New { args, .. } => {
            for a in args {
                collect_expr(a, uses);
            }
        }
    }
}
