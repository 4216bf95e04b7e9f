//! Legality check for substituting arguments into an inlined callee.
//!
//! Inlining `f(a0, a1, ..)` as `f`'s return expression with every parameter
//! replaced by its argument changes when (and how often) each argument is
//! evaluated. A [`CallContext`] certifies that this is unobservable:
//!
//! - value arguments (see [`Expr::is_value`]) may be duplicated, dropped or
//!   moved freely and are not tracked;
//! - every other argument must be evaluated exactly once, unconditionally,
//!   in the original left-to-right order relative to the other tracked
//!   arguments (unless all arguments are read-only and cannot throw), and
//!   only where the callee work performed before it commutes with the
//!   argument's own effects;
//! - an argument that is never evaluated may only be dropped if every
//!   argument is read-only and the dropped one cannot throw.
//!
//! The walker reports each parameter occurrence with
//! [`visit_parameter`](CallContext::visit_parameter) and asks
//! [`finish`](CallContext::finish) at the end. Any violation fails the
//! context permanently; the call is then left as it is.

use rustc_hash::FxHashMap;

use crate::{
    analysis::{Effects, Lattice},
    ir::{Expr, Id, VariableTable},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamState {
    /// Value argument; occurrences are unrestricted.
    NotTracked,
    NotSeen,
    Seen,
}

/// Per-call-site inlining legality state.
#[derive(Debug, Clone)]
pub struct CallContext {
    parameters: FxHashMap<Id, usize>,
    argument_effects: Vec<Effects>,
    all_argument_effects: Effects,
    all_read_only: bool,
    commutable: bool,
    seen: Vec<ParamState>,
    failed: bool,
}

impl CallContext {
    /// Builds the context for a call with `arguments` (in the caller's
    /// `vars`) to a callee with formals `parameters`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the counts differ, and
    /// [`crate::Error::UnknownVariable`] if an argument reads a variable missing
    /// from `vars`.
    pub fn new(vars: &VariableTable, parameters: &[Id], arguments: &[Expr]) -> Result<Self> {
        if parameters.len() != arguments.len() {
            return Err(malformed_error!(
                "call passes {} arguments to {} parameters",
                arguments.len(),
                parameters.len()
            ));
        }

        let frame = vars.frame();
        let mut argument_effects = Vec::with_capacity(arguments.len());
        let mut all_argument_effects = Effects::bottom(frame);
        let mut seen = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let effects = argument.effects(vars)?;
            all_argument_effects.include(&effects);
            argument_effects.push(effects);
            seen.push(if argument.is_value(vars) {
                ParamState::NotTracked
            } else {
                ParamState::NotSeen
            });
        }

        Ok(Self {
            parameters: parameters
                .iter()
                .enumerate()
                .map(|(i, &id)| (id, i))
                .collect(),
            all_read_only: argument_effects.iter().all(Effects::is_read_only),
            commutable: Effects::all_commutable(&argument_effects),
            argument_effects,
            all_argument_effects,
            seen,
            failed: false,
        })
    }

    /// Position of `id` among the callee's formals.
    #[must_use]
    pub fn parameter_index(&self, id: Id) -> Option<usize> {
        self.parameters.get(&id).copied()
    }

    /// Effects of evaluating argument `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not an argument position.
    #[must_use]
    pub fn argument_effects(&self, index: usize) -> &Effects {
        &self.argument_effects[index]
    }

    /// Join of all argument effects.
    #[must_use]
    pub fn all_argument_effects(&self) -> &Effects {
        &self.all_argument_effects
    }

    /// `true` if no argument writes anything.
    #[must_use]
    pub fn all_read_only(&self) -> bool {
        self.all_read_only
    }

    /// `true` while no rule has been violated.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.failed
    }

    /// Marks the context unusable. Idempotent.
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Records an occurrence of parameter `index` in the callee.
    ///
    /// `accumulated` holds the effects of the callee work evaluated before
    /// this occurrence, excluding substituted arguments. `unconditional` is
    /// `false` inside a conditional arm or a short-circuit right operand.
    pub fn visit_parameter(&mut self, index: usize, accumulated: &Effects, unconditional: bool) {
        if self.failed {
            return;
        }
        match self.seen.get(index).copied() {
            Some(ParamState::NotTracked) => return,
            Some(ParamState::NotSeen) => {}
            Some(ParamState::Seen) | None => {
                self.fail();
                return;
            }
        }

        let in_order = self.commutable
            || self.seen[..index]
                .iter()
                .all(|&s| s != ParamState::NotSeen);
        let frame = accumulated.frame().max(self.argument_effects[index].frame());
        let movable = accumulated
            .extend_to(frame)
            .commutable_with(&self.argument_effects[index].extend_to(frame));

        if unconditional && in_order && movable {
            self.seen[index] = ParamState::Seen;
        } else {
            self.fail();
        }
    }

    /// Final check once the whole callee was scanned; returns [`is_ok`](Self::is_ok).
    pub fn finish(&mut self) -> bool {
        let dropped_effectful = self
            .seen
            .iter()
            .zip(&self.argument_effects)
            .any(|(&s, e)| s == ParamState::NotSeen && (!self.all_read_only || e.may_throw()));
        if dropped_effectful {
            self.fail();
        }
        self.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ReadWrite,
        ir::{FieldRef, MethodRef, TypeRef, VariableFlags},
    };

    struct Fixture {
        vars: VariableTable,
        v: Id,
        p0: Id,
        p1: Id,
    }

    fn fixture() -> Fixture {
        let int = TypeRef::new("mscorlib", "System.Int32");
        let mut vars = VariableTable::new();
        let v = vars.declare_named_local("v", int, VariableFlags::empty());
        Fixture {
            vars,
            v,
            p0: Id::new(100),
            p1: Id::new(101),
        }
    }

    fn side_effect() -> Expr {
        Expr::call(
            MethodRef::new_static(TypeRef::new("app", "P"), "g", 0),
            vec![],
        )
    }

    fn heap_read() -> Expr {
        Expr::Read(crate::ir::Cell::StaticField(FieldRef::new(
            TypeRef::new("app", "P"),
            "counter",
        )))
    }

    fn nothing(f: &Fixture) -> Effects {
        Effects::bottom(f.vars.frame())
    }

    #[test]
    fn test_duplicate_effectful_argument() {
        let f = fixture();
        let x = side_effect();
        let params = [f.p0, f.p1];

        let ctx = CallContext::new(&f.vars, &params, &[x.clone(), x.clone()]).unwrap();
        assert!(!ctx.all_read_only());
        assert_eq!(ctx.parameter_index(f.p1), Some(1));

        // In order, once each.
        let mut ok = ctx.clone();
        ok.visit_parameter(0, &nothing(&f), true);
        ok.visit_parameter(1, &nothing(&f), true);
        assert!(ok.finish());

        // Second occurrence of p0.
        let mut twice = ctx.clone();
        twice.visit_parameter(0, &nothing(&f), true);
        twice.visit_parameter(0, &nothing(&f), true);
        assert!(!twice.finish());

        // Out of order.
        let mut swapped = ctx.clone();
        swapped.visit_parameter(1, &nothing(&f), true);
        swapped.visit_parameter(0, &nothing(&f), true);
        assert!(!swapped.finish());

        // p1 never evaluated.
        let mut dropped = ctx;
        dropped.visit_parameter(0, &nothing(&f), true);
        assert!(!dropped.finish());
    }

    #[test]
    fn test_value_arguments_are_untracked() {
        let f = fixture();
        let mut ctx =
            CallContext::new(&f.vars, &[f.p0, f.p1], &[Expr::read(f.v), Expr::int(1)]).unwrap();
        assert!(ctx.all_read_only());
        ctx.visit_parameter(1, &nothing(&f), false);
        ctx.visit_parameter(0, &nothing(&f), true);
        ctx.visit_parameter(0, &nothing(&f), true);
        assert!(ctx.finish());
    }

    #[test]
    fn test_conditional_occurrence_fails() {
        let f = fixture();
        let mut ctx = CallContext::new(&f.vars, &[f.p0], &[side_effect()]).unwrap();
        ctx.visit_parameter(0, &nothing(&f), false);
        assert!(!ctx.is_ok());
        assert!(!ctx.finish());
    }

    #[test]
    fn test_argument_must_commute_with_prior_work() {
        let f = fixture();
        let write_heap = Effects::make_heap(f.vars.frame(), ReadWrite::Write, false);

        let mut reads_heap = CallContext::new(&f.vars, &[f.p0], &[heap_read()]).unwrap();
        reads_heap.visit_parameter(0, &write_heap, true);
        assert!(!reads_heap.finish());

        let local_write = Effects::local(f.vars.frame(), 0, ReadWrite::Write);
        let mut ok = CallContext::new(&f.vars, &[f.p0], &[heap_read()]).unwrap();
        ok.visit_parameter(0, &local_write, true);
        assert!(ok.finish());
    }

    #[test]
    fn test_read_only_arguments_may_be_dropped_or_reordered() {
        let f = fixture();
        let args = [heap_read(), heap_read()];
        let mut ctx = CallContext::new(&f.vars, &[f.p0, f.p1], &args).unwrap();
        assert!(ctx.all_read_only());
        ctx.visit_parameter(1, &nothing(&f), true);
        assert!(ctx.finish());
    }

    #[test]
    fn test_fail_is_sticky() {
        let f = fixture();
        let mut ctx = CallContext::new(&f.vars, &[f.p0], &[side_effect()]).unwrap();
        ctx.fail();
        ctx.fail();
        ctx.visit_parameter(0, &nothing(&f), true);
        assert!(!ctx.finish());
    }

    #[test]
    fn test_arity_mismatch() {
        let f = fixture();
        assert!(CallContext::new(&f.vars, &[f.p0], &[]).is_err());
    }
}
