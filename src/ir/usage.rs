//! Usage collection over the IR.
//!
//! Sub-terms that always execute with their parent are merged sequentially;
//! conditional arms and the right operand of a short-circuit operator are
//! merged as alternatives (the latter against an empty record, since it may
//! not execute at all).

use crate::{
    analysis::Usage,
    ir::{Cell, Expr, MethodBody, Stmt},
};

impl Cell {
    fn accum_usage(&self, usage: &mut Usage, always: bool) {
        match self {
            Cell::Variable(id) => usage.add_variable(*id, 1, always),
            Cell::Field { object, field } => {
                object.accum_usage(usage, always);
                usage.add_field(field, 1, always);
            }
            Cell::StaticField(field) => usage.add_field(field, 1, always),
            Cell::Element { array, index } => {
                array.accum_usage(usage, always);
                index.accum_usage(usage, always);
            }
            Cell::Deref(pointer) => pointer.accum_usage(usage, always),
        }
    }

    /// Usage of a cell as an assignment target: its operands and entity, but
    /// not a read of the variable it names.
    fn accum_target_usage(&self, usage: &mut Usage, always: bool) {
        match self {
            Cell::Variable(_) => {}
            _ => self.accum_usage(usage, always),
        }
    }
}

fn alternatives(arms: &[Usage], usage: &mut Usage, always: bool) {
    usage.merge(&Usage::merge_alternatives(arms), always);
}

impl Expr {
    /// Adds the references made by this expression to `usage`.
    ///
    /// `always` tells whether the expression executes on every path through
    /// its enclosing code.
    pub fn accum_usage(&self, usage: &mut Usage, always: bool) {
        match self {
            Expr::Const(_) => {}
            Expr::Read(cell) => cell.accum_usage(usage, always),
            Expr::AddressOf(Cell::Variable(id)) => usage.add_variable_pointer(*id, 1, always),
            Expr::AddressOf(cell) => cell.accum_target_usage(usage, always),
            Expr::Unary(_, e) | Expr::Export(e) | Expr::Import(e) => e.accum_usage(usage, always),
            Expr::Binary(_, l, r) => {
                l.accum_usage(usage, always);
                r.accum_usage(usage, always);
            }
            Expr::Logical(_, l, r) => {
                l.accum_usage(usage, always);
                alternatives(&[r.usage(), Usage::new()], usage, always);
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.accum_usage(usage, always);
                alternatives(&[then.usage(), otherwise.usage()], usage, always);
            }
            Expr::Call {
                method,
                receiver,
                args,
            } => {
                usage.add_method(method, 1, always);
                if let Some(r) = receiver {
                    r.accum_usage(usage, always);
                }
                for a in args {
                    a.accum_usage(usage, always);
                }
            }
            Expr::New { ctor, args } => {
                usage.add_method(ctor, 1, always);
                for a in args {
                    a.accum_usage(usage, always);
                }
            }
        }
    }

    /// References made by this expression, assuming it executes.
    #[must_use]
    pub fn usage(&self) -> Usage {
        let mut usage = Usage::new();
        self.accum_usage(&mut usage, true);
        usage
    }
}

fn block_usage(stmts: &[Stmt]) -> Usage {
    let mut usage = Usage::new();
    for s in stmts {
        s.accum_usage(&mut usage, true);
    }
    usage
}

impl Stmt {
    /// Adds the references made by this statement to `usage`.
    pub fn accum_usage(&self, usage: &mut Usage, always: bool) {
        match self {
            Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Return(Some(e)) => e.accum_usage(usage, always),
            Stmt::Return(None) => {}
            Stmt::Assign(cell, value) => {
                cell.accum_target_usage(usage, always);
                value.accum_usage(usage, always);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.accum_usage(usage, always);
                alternatives(&[block_usage(then), block_usage(otherwise)], usage, always);
            }
        }
    }
}

impl MethodBody {
    /// References made by the whole body.
    #[must_use]
    pub fn usage(&self) -> Usage {
        block_usage(&self.statements)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::POSSIBLE,
        ir::{Expr, Id, LogicalOp, MethodRef, Stmt, TypeRef},
    };

    fn helper(name: &str) -> MethodRef {
        MethodRef::new_static(TypeRef::new("lib", "Lib.Helpers"), name, 0)
    }

    #[test]
    fn test_conditional_arms_are_alternatives() {
        let x = Id::new(0);
        let both = helper("Both");
        let left = helper("Left");
        let e = Expr::Conditional {
            cond: Box::new(Expr::read(x)),
            then: Box::new(Expr::binary(
                crate::ir::BinaryOp::Add,
                Expr::call(both.clone(), vec![]),
                Expr::call(left.clone(), vec![]),
            )),
            otherwise: Box::new(Expr::call(both.clone(), vec![])),
        };
        let u = e.usage();
        assert_eq!(u.variable(x), Some(1));
        assert_eq!(u.method(&both), Some(1));
        assert_eq!(u.method(&left), Some(POSSIBLE));
        // The declaring type is referenced by both arms.
        assert_eq!(u.ty(&both.declaring), Some(1));
    }

    #[test]
    fn test_short_circuit_right_operand_is_possible() {
        let m = helper("Check");
        let e = Expr::Logical(
            LogicalOp::And,
            Box::new(Expr::read(Id::new(0))),
            Box::new(Expr::call(m.clone(), vec![])),
        );
        assert_eq!(e.usage().method(&m), Some(POSSIBLE));
    }

    #[test]
    fn test_assignment_target_is_not_a_read() {
        let x = Id::new(0);
        let y = Id::new(1);
        let mut u = crate::analysis::Usage::new();
        Stmt::assign(x, Expr::read(y)).accum_usage(&mut u, true);
        assert_eq!(u.variable(x), None);
        assert_eq!(u.variable(y), Some(1));

        Stmt::Expr(Expr::address_of(x)).accum_usage(&mut u, true);
        assert_eq!(u.variable_pointer(x), Some(1));
    }

    #[test]
    fn test_if_branches() {
        let m = helper("Log");
        let stmt = Stmt::If {
            cond: Expr::int(1),
            then: vec![Stmt::Expr(Expr::call(m.clone(), vec![]))],
            otherwise: vec![],
        };
        let mut u = crate::analysis::Usage::new();
        stmt.accum_usage(&mut u, true);
        assert_eq!(u.method(&m), Some(POSSIBLE));
    }
}
