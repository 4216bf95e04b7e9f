//! Effect, points-to and value queries over the IR.
//!
//! Effects are built against the [`Frame`] of the variable table passed in
//! and joined into the accumulator with [`Effects::include`], so an
//! accumulator created before the table grew keeps working.
//!
//! | Term | Effect |
//! |------|--------|
//! | variable read / write | read / write of its slot |
//! | instance field, element | heap access, may throw |
//! | static field | heap access |
//! | `*p` | access to whatever `p` may point to |
//! | `/`, `%` | may throw |
//! | call, `new`, marshalling | heap write, may throw, write through pointer operands |

use crate::{
    analysis::{Effects, Frame, Lattice, PointsTo, ReadWrite},
    ir::{Cell, Expr, Slot, Stmt, VariableFlags, VariableTable},
    Result,
};

fn slot_effect(frame: Frame, slot: Slot, rw: ReadWrite) -> Effects {
    match slot {
        Slot::Argument(i) => Effects::arg(frame, i, rw),
        Slot::Local(i) => Effects::local(frame, i, rw),
    }
}

fn slot_points_to(frame: Frame, slot: Slot) -> PointsTo {
    match slot {
        Slot::Argument(i) => PointsTo::arg(frame, i),
        Slot::Local(i) => PointsTo::local(frame, i),
    }
}

/// Effects of an opaque operation itself: heap write, may throw, and a write
/// through every pointer operand.
fn accum_opaque<'a>(
    operands: impl IntoIterator<Item = &'a Expr>,
    vars: &VariableTable,
    effects: &mut Effects,
) -> Result<()> {
    for operand in operands {
        effects.include(&operand.points_to(vars)?.write_effect());
    }
    effects.include(&Effects::make_heap(vars.frame(), ReadWrite::Write, true));
    Ok(())
}

impl Cell {
    /// Accumulates the effects of evaluating the cell's operands and then
    /// accessing the cell with polarity `rw`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn accum_effects(
        &self,
        rw: ReadWrite,
        vars: &VariableTable,
        effects: &mut Effects,
    ) -> Result<()> {
        self.accum_operand_effects(vars, effects)?;
        self.accum_access_effects(rw, vars, effects)
    }

    /// Accumulates the effects of the access alone, operands excluded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn accum_access_effects(
        &self,
        rw: ReadWrite,
        vars: &VariableTable,
        effects: &mut Effects,
    ) -> Result<()> {
        let frame = vars.frame();
        match self {
            Cell::Variable(id) => effects.include(&slot_effect(frame, vars.slot(*id)?, rw)),
            Cell::Field { .. } | Cell::Element { .. } => {
                effects.include(&Effects::make_heap(frame, rw, true));
            }
            Cell::StaticField(_) => effects.include(&Effects::make_heap(frame, rw, false)),
            Cell::Deref(pointer) => {
                let target = pointer.points_to(vars)?;
                effects.include(&match rw {
                    ReadWrite::Write => target.write_effect(),
                    _ => target.read_effect(),
                });
            }
        }
        Ok(())
    }

    /// Accumulates only the effects of evaluating the cell's operands, as for
    /// taking its address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn accum_operand_effects(&self, vars: &VariableTable, effects: &mut Effects) -> Result<()> {
        match self {
            Cell::Variable(_) | Cell::StaticField(_) => Ok(()),
            Cell::Field { object, .. } => object.accum_effects(vars, effects),
            Cell::Element { array, index } => {
                array.accum_effects(vars, effects)?;
                index.accum_effects(vars, effects)
            }
            Cell::Deref(pointer) => pointer.accum_effects(vars, effects),
        }
    }

    /// Storage the address of this cell may point to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn address_points_to(&self, vars: &VariableTable) -> Result<PointsTo> {
        let frame = vars.frame();
        match self {
            Cell::Variable(id) => Ok(slot_points_to(frame, vars.slot(*id)?)),
            Cell::Field { .. } | Cell::StaticField(_) | Cell::Element { .. } => {
                Ok(PointsTo::heap(frame))
            }
            Cell::Deref(pointer) => pointer.points_to(vars),
        }
    }
}

impl Expr {
    /// Joins the effects of evaluating this expression into `effects`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn accum_effects(&self, vars: &VariableTable, effects: &mut Effects) -> Result<()> {
        match self {
            Expr::Const(_) => {}
            Expr::Read(cell) | Expr::AddressOf(cell) => cell.accum_operand_effects(vars, effects)?,
            Expr::Unary(_, e) | Expr::Export(e) | Expr::Import(e) => e.accum_effects(vars, effects)?,
            Expr::Binary(_, l, r) | Expr::Logical(_, l, r) => {
                l.accum_effects(vars, effects)?;
                r.accum_effects(vars, effects)?;
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.accum_effects(vars, effects)?;
                then.accum_effects(vars, effects)?;
                otherwise.accum_effects(vars, effects)?;
            }
            Expr::Call { receiver, args, .. } => {
                for operand in receiver.as_deref().into_iter().chain(args) {
                    operand.accum_effects(vars, effects)?;
                }
            }
            Expr::New { args, .. } => {
                for operand in args {
                    operand.accum_effects(vars, effects)?;
                }
            }
        }
        self.accum_own_effects(vars, effects)
    }

    /// Joins the effects of this node's own operation into `effects`, with
    /// the evaluation of its operands excluded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn accum_own_effects(&self, vars: &VariableTable, effects: &mut Effects) -> Result<()> {
        match self {
            Expr::Read(cell) => cell.accum_access_effects(ReadWrite::Read, vars, effects),
            Expr::Binary(op, ..) if op.may_throw() => {
                effects.include(&Effects::make_throws(vars.frame()));
                Ok(())
            }
            Expr::Call { receiver, args, .. } => {
                accum_opaque(receiver.as_deref().into_iter().chain(args), vars, effects)
            }
            Expr::New { args, .. } => accum_opaque(args, vars, effects),
            Expr::Export(e) | Expr::Import(e) => accum_opaque([&**e], vars, effects),
            Expr::Const(_)
            | Expr::AddressOf(_)
            | Expr::Unary(..)
            | Expr::Binary(..)
            | Expr::Logical(..)
            | Expr::Conditional { .. } => Ok(()),
        }
    }

    /// Returns the effects of evaluating this expression on its own.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn effects(&self, vars: &VariableTable) -> Result<Effects> {
        let mut effects = Effects::bottom(vars.frame());
        self.accum_effects(vars, &mut effects)?;
        Ok(effects)
    }

    /// Storage the value of this expression may point to.
    ///
    /// Non-pointer values are bottom. A by-ref argument was supplied by the
    /// caller and may only point outside this frame, which is summarised as
    /// the heap; a by-ref local may hold any address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn points_to(&self, vars: &VariableTable) -> Result<PointsTo> {
        let frame = vars.frame();
        match self {
            Expr::AddressOf(cell) => cell.address_points_to(vars),
            Expr::Read(Cell::Variable(id)) => {
                let var = vars.get(*id)?;
                Ok(match (var.ty.is_pointer(), var.slot) {
                    (false, _) => PointsTo::bottom(frame),
                    (true, Slot::Argument(_)) => PointsTo::heap(frame),
                    (true, Slot::Local(_)) => PointsTo::top(frame),
                })
            }
            Expr::Read(_) => Ok(PointsTo::bottom(frame)),
            Expr::Conditional {
                then, otherwise, ..
            } => {
                let mut result = then.points_to(vars)?;
                let mut changed = false;
                result.lub_changed(&otherwise.points_to(vars)?, &mut changed)?;
                Ok(result)
            }
            Expr::Call { .. } | Expr::Import(_) => Ok(PointsTo::heap(frame)),
            Expr::Export(e) => e.points_to(vars),
            Expr::Const(_)
            | Expr::Unary(..)
            | Expr::Binary(..)
            | Expr::Logical(..)
            | Expr::New { .. } => Ok(PointsTo::bottom(frame)),
        }
    }

    /// Returns `true` if this expression has no observable effect and may be
    /// duplicated or moved freely: constants, reads of variables whose address
    /// is never taken, and addresses of variables.
    #[must_use]
    pub fn is_value(&self, vars: &VariableTable) -> bool {
        match self {
            Expr::Const(_) | Expr::AddressOf(Cell::Variable(_)) => true,
            Expr::Read(Cell::Variable(id)) => vars
                .get(*id)
                .is_ok_and(|v| !v.flags.contains(VariableFlags::ADDRESS_TAKEN)),
            _ => false,
        }
    }
}

impl Stmt {
    /// Joins the effects of executing this statement into `effects`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for variables missing from `vars`.
    pub fn accum_effects(&self, vars: &VariableTable, effects: &mut Effects) -> Result<()> {
        match self {
            Stmt::Expr(e) | Stmt::Return(Some(e)) => e.accum_effects(vars, effects),
            Stmt::Return(None) => Ok(()),
            Stmt::Throw(e) => {
                e.accum_effects(vars, effects)?;
                effects.include(&Effects::make_throws(vars.frame()));
                Ok(())
            }
            Stmt::Assign(cell, value) => {
                value.accum_effects(vars, effects)?;
                cell.accum_effects(ReadWrite::Write, vars, effects)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.accum_effects(vars, effects)?;
                for s in then.iter().chain(otherwise) {
                    s.accum_effects(vars, effects)?;
                }
                Ok(())
            }
        }
    }
}
