//! Rewriting environment of the simplifier.
//!
//! A [`SimplifierContext`] carries three pieces of state through the walk:
//!
//! - the substitution map from identifiers to expressions;
//! - an optional open statement buffer (absent in expression-only regions);
//! - the effects of the work committed since the last reordering boundary.
//!
//! Child contexts borrow from their parent and are strictly nested, so
//! sharing is expressed with `&mut` borrows and copying with a clone of the
//! map; no persistent data structure is needed.
//!
//! | Mode | Substitution | Statements | Effects |
//! |------|--------------|------------|---------|
//! | [`root`](SimplifierContext::root) | empty | none | bottom |
//! | [`in_local_effects`](SimplifierContext::in_local_effects) | shared | shared | bottom |
//! | [`in_sub_method`](SimplifierContext::in_sub_method) | copied | fresh | bottom |
//! | [`in_fresh_statements`](SimplifierContext::in_fresh_statements) | shared | fresh | bottom |
//! | [`in_no_statements`](SimplifierContext::in_no_statements) | shared | none | inherited |

use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashMap;

use crate::{
    analysis::Effects,
    compiler::{EventKind, EventLog, InlinePolicy},
    ir::{Cell, Expr, Id, MethodRef, Stmt, TypeRef, VariableFlags, VariableTable},
    Error, Result,
};

/// State either owned by a context or borrowed from its parent.
enum Scoped<'a, T> {
    Owned(T),
    Borrowed(&'a mut T),
}

impl<T> Deref for Scoped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Scoped::Owned(value) => value,
            Scoped::Borrowed(value) => value,
        }
    }
}

impl<T> DerefMut for Scoped<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Scoped::Owned(value) => value,
            Scoped::Borrowed(value) => value,
        }
    }
}

/// Mutable rewriting environment for one simplification of one method.
pub struct SimplifierContext<'a> {
    bindings: Scoped<'a, FxHashMap<Id, Expr>>,
    statements: Option<Scoped<'a, Vec<Stmt>>>,
    effects: Effects,
    vars: &'a mut VariableTable,
    policy: &'a dyn InlinePolicy,
    events: &'a EventLog,
    method: &'a MethodRef,
}

impl<'a> SimplifierContext<'a> {
    /// Creates the outermost context for simplifying `method`, whose
    /// variables are `vars`.
    pub fn root(
        vars: &'a mut VariableTable,
        policy: &'a dyn InlinePolicy,
        events: &'a EventLog,
        method: &'a MethodRef,
    ) -> Self {
        Self {
            bindings: Scoped::Owned(FxHashMap::default()),
            statements: None,
            effects: Effects::bottom(vars.frame()),
            vars,
            policy,
            events,
            method,
        }
    }

    /// Same substitution and statement buffer, effects reset.
    pub fn in_local_effects(&mut self) -> SimplifierContext<'_> {
        let frame = self.vars.frame();
        let bindings = Scoped::Borrowed(&mut *self.bindings);
        let statements = self
            .statements
            .as_mut()
            .map(|s| Scoped::Borrowed(&mut **s));
        SimplifierContext {
            bindings,
            statements,
            effects: Effects::bottom(frame),
            vars: &mut *self.vars,
            policy: self.policy,
            events: self.events,
            method: self.method,
        }
    }

    /// Copied substitution and a fresh statement buffer, for splicing in a
    /// callee. Bindings made in the child are invisible to `self`.
    pub fn in_sub_method(&mut self) -> SimplifierContext<'_> {
        let frame = self.vars.frame();
        SimplifierContext {
            bindings: Scoped::Owned((*self.bindings).clone()),
            statements: Some(Scoped::Owned(Vec::new())),
            effects: Effects::bottom(frame),
            vars: &mut *self.vars,
            policy: self.policy,
            events: self.events,
            method: self.method,
        }
    }

    /// Shared substitution and a fresh statement buffer.
    pub fn in_fresh_statements(&mut self) -> SimplifierContext<'_> {
        let frame = self.vars.frame();
        SimplifierContext {
            bindings: Scoped::Borrowed(&mut *self.bindings),
            statements: Some(Scoped::Owned(Vec::new())),
            effects: Effects::bottom(frame),
            vars: &mut *self.vars,
            policy: self.policy,
            events: self.events,
            method: self.method,
        }
    }

    /// Shared substitution and no statement buffer: any attempt to emit a
    /// statement fails.
    pub fn in_no_statements(&mut self) -> SimplifierContext<'_> {
        let effects = self.effects.clone();
        SimplifierContext {
            bindings: Scoped::Borrowed(&mut *self.bindings),
            statements: None,
            effects,
            vars: &mut *self.vars,
            policy: self.policy,
            events: self.events,
            method: self.method,
        }
    }

    /// Installs or overwrites the substitution for `id`.
    pub fn bind(&mut self, id: Id, expr: Expr) {
        self.bindings.insert(id, expr);
    }

    /// Returns the substitution for `id`, if any.
    #[must_use]
    pub fn lookup(&self, id: Id) -> Option<&Expr> {
        self.bindings.get(&id)
    }

    /// The substituted expression for `id`, or a read of `id` itself.
    #[must_use]
    pub fn apply_read_from(&self, id: Id) -> Expr {
        self.lookup(id).cloned().unwrap_or_else(|| Expr::read(id))
    }

    /// Looks through a substituted variable to the cell it stands for.
    ///
    /// Non-variable cells are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the variable is bound to something
    /// other than a read of a cell; such a variable cannot be written or
    /// have its address taken.
    pub fn apply_cell(&self, cell: Cell) -> Result<Cell> {
        match cell {
            Cell::Variable(id) => match self.lookup(id) {
                None => Ok(Cell::Variable(id)),
                Some(Expr::Read(target)) => Ok(target.clone()),
                Some(other) => Err(malformed_error!(
                    "variable {} is bound to non-storage {:?}",
                    id,
                    other
                )),
            },
            other => Ok(other),
        }
    }

    /// Looks through a substituted variable to the variable it stands for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `id` is bound to anything but a
    /// variable read.
    pub fn apply_id(&self, id: Id) -> Result<Id> {
        match self.lookup(id) {
            None => Ok(id),
            Some(expr) => expr
                .as_variable_read()
                .ok_or_else(|| malformed_error!("variable {} is bound to {:?}", id, expr)),
        }
    }

    /// Gives callee parameter `param` a private local of type `ty` in the
    /// method being simplified, and binds `param` to a read of it.
    ///
    /// The local keeps the parameter's `flags`, so a parameter whose address
    /// is taken in the callee yields a local that is not a value.
    pub fn freshen_argument(&mut self, param: Id, ty: TypeRef, flags: VariableFlags) -> Id {
        let fresh = self.vars.declare_local(ty, flags | VariableFlags::INIT);
        self.bind(param, Expr::read(fresh));
        self.events
            .record(EventKind::ArgumentFreshened)
            .method(self.method)
            .message(format!("{param} -> {fresh}"));
        fresh
    }

    /// Renames every local of a callee (declared in `callee`) to a fresh
    /// local of the method being simplified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if `callee` is inconsistent.
    pub fn freshen_locals(&mut self, callee: &VariableTable) -> Result<()> {
        let mut count = 0;
        for local in callee.locals() {
            let declared = callee.get(local)?;
            let fresh = self.vars.declare_named_local(
                format!("{}{}", declared.name, self.vars.len()),
                declared.ty.clone(),
                declared.flags,
            );
            self.bind(local, Expr::read(fresh));
            count += 1;
        }
        if count > 0 {
            self.events
                .record(EventKind::LocalsFreshened)
                .method(self.method)
                .message(format!("{count} locals"));
        }
        Ok(())
    }

    /// Appends `stmt` to the open statement buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoStatementBuffer`] in an expression-only context.
    pub fn add(&mut self, stmt: Stmt) -> Result<()> {
        match self.statements.as_mut() {
            Some(buffer) => {
                buffer.push(stmt);
                Ok(())
            }
            None => Err(Error::NoStatementBuffer),
        }
    }

    /// Appends `stmt` and joins its effects into the accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoStatementBuffer`] in an expression-only context.
    pub fn emit(&mut self, stmt: Stmt) -> Result<()> {
        let mut effects = Effects::bottom(self.vars.frame());
        stmt.accum_effects(&*self.vars, &mut effects)?;
        self.add(stmt)?;
        self.effects.include(&effects);
        Ok(())
    }

    /// Joins `effects` into the accumulated effects.
    pub fn include_effects(&mut self, effects: &Effects) {
        self.effects.include(effects);
    }

    /// Effects of the work committed in this context so far.
    #[must_use]
    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    /// `true` if statements may be emitted.
    #[must_use]
    pub fn has_statements(&self) -> bool {
        self.statements.is_some()
    }

    /// Removes and returns the statements buffered so far.
    pub fn take_statements(&mut self) -> Vec<Stmt> {
        self.statements
            .as_mut()
            .map(|s| std::mem::take(&mut **s))
            .unwrap_or_default()
    }

    /// Variables of the method being simplified.
    #[must_use]
    pub fn vars(&self) -> &VariableTable {
        &*self.vars
    }

    /// The inlining oracle.
    #[must_use]
    pub fn policy(&self) -> &'a dyn InlinePolicy {
        self.policy
    }

    /// The event log.
    #[must_use]
    pub fn events(&self) -> &'a EventLog {
        self.events
    }

    /// The method being simplified.
    #[must_use]
    pub fn method(&self) -> &'a MethodRef {
        self.method
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{Lattice, ReadWrite},
        compiler::DefaultPolicy,
        ir::{Slot, TypeRef},
    };

    fn int() -> TypeRef {
        TypeRef::new("mscorlib", "System.Int32")
    }

    fn setup() -> (VariableTable, Id, Id, MethodRef) {
        let mut vars = VariableTable::new();
        let a = vars.declare_argument("a", int());
        let x = vars.declare_named_local("x", int(), VariableFlags::empty());
        let m = MethodRef::new_static(TypeRef::new("app", "P"), "m", 1);
        (vars, a, x, m)
    }

    #[test]
    fn test_sub_method_bindings_are_private() {
        let (mut vars, a, x, m) = setup();
        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
        root.bind(x, Expr::int(7));

        {
            let mut child = root.in_sub_method();
            assert_eq!(child.apply_read_from(x), Expr::int(7));
            child.bind(a, Expr::int(1));
            assert_eq!(child.apply_read_from(a), Expr::int(1));
        }
        assert_eq!(root.apply_read_from(a), Expr::read(a));
    }

    #[test]
    fn test_shared_modes_see_bindings() {
        let (mut vars, a, _, m) = setup();
        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
        {
            let mut fresh = root.in_fresh_statements();
            fresh.bind(a, Expr::int(2));
        }
        assert_eq!(root.apply_read_from(a), Expr::int(2));
    }

    #[test]
    fn test_no_statements_add_fails() {
        let (mut vars, _, x, m) = setup();
        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
        assert!(!root.has_statements());

        let mut fresh = root.in_fresh_statements();
        fresh.add(Stmt::assign(x, Expr::int(0))).unwrap();
        let mut none = fresh.in_no_statements();
        assert!(matches!(
            none.add(Stmt::assign(x, Expr::int(1))),
            Err(Error::NoStatementBuffer)
        ));
        assert_eq!(fresh.take_statements().len(), 1);
    }

    #[test]
    fn test_local_effects_share_buffer() {
        let (mut vars, _, x, m) = setup();
        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
        let mut fresh = root.in_fresh_statements();
        fresh.emit(Stmt::assign(x, Expr::int(0))).unwrap();
        assert_eq!(fresh.effects().locals().get(0), ReadWrite::Write);
        {
            let mut local = fresh.in_local_effects();
            assert!(local.effects().is_bottom());
            local.emit(Stmt::assign(x, Expr::int(1))).unwrap();
        }
        assert_eq!(fresh.take_statements().len(), 2);
    }

    #[test]
    fn test_apply_cell_and_id() {
        let (mut vars, a, x, m) = setup();
        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
        root.bind(a, Expr::read(x));
        assert_eq!(root.apply_cell(Cell::Variable(a)).unwrap(), Cell::Variable(x));
        assert_eq!(root.apply_id(a).unwrap(), x);
        assert_eq!(root.apply_id(x).unwrap(), x);

        root.bind(a, Expr::int(3));
        assert!(root.apply_cell(Cell::Variable(a)).is_err());
        assert!(root.apply_id(a).is_err());
    }

    #[test]
    fn test_freshening() {
        let (mut vars, a, _, m) = setup();
        let mut callee = VariableTable::new();
        let p = callee.declare_argument("p", int());
        let l = callee.declare_named_local("l", int(), VariableFlags::READ);

        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        {
            let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
            let mut sub = root.in_sub_method();
            let fresh = sub.freshen_argument(p, int(), VariableFlags::empty());
            assert_eq!(sub.apply_read_from(p), Expr::read(fresh));
            assert!(Expr::read(fresh).is_value(sub.vars()));
            sub.freshen_locals(&callee).unwrap();
            let renamed = sub.apply_id(l).unwrap();
            assert_ne!(renamed, l);
            assert_eq!(sub.vars().slot(renamed).unwrap(), Slot::Local(2));
        }
        assert_eq!(vars.frame().locals, 3);
        assert_eq!(vars.slot(a).unwrap(), Slot::Argument(0));
        assert!(events.has(EventKind::ArgumentFreshened));
        assert!(events.has(EventKind::LocalsFreshened));
    }

    #[test]
    fn test_freshened_argument_keeps_address_taken() {
        let (mut vars, _, _, m) = setup();
        let mut callee = VariableTable::new();
        let p = callee.declare_argument("p", int());
        callee.mark(p, VariableFlags::ADDRESS_TAKEN).unwrap();
        let declared = callee.get(p).unwrap().clone();

        let policy = DefaultPolicy::new();
        let events = EventLog::new();
        let mut root = SimplifierContext::root(&mut vars, &policy, &events, &m);
        let mut sub = root.in_sub_method();
        let fresh = sub.freshen_argument(p, declared.ty, declared.flags);

        let flags = sub.vars().get(fresh).unwrap().flags;
        assert!(flags.contains(VariableFlags::ADDRESS_TAKEN | VariableFlags::INIT));
        assert!(!Expr::read(fresh).is_value(sub.vars()));
    }
}
