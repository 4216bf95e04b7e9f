//! Substitution-based simplification and call inlining.
//!
//! The [`Simplifier`] rewrites one method body at a time. It walks the
//! statements in order with a [`SimplifierContext`], rewriting every variable
//! access through the current substitution, and replaces calls with the
//! callee's body wherever the [`InlinePolicy`] allows it and the rewrite is
//! unobservable.
//!
//! # Inlining modes
//!
//! Where a statement buffer is open, a callee of the form
//! `s1; ..; sn; return e` is spliced in: non-value arguments are evaluated
//! once into fresh locals at the call point, callee locals are renamed, the
//! statements are emitted and `e` replaces the call.
//!
//! Inside expression-only regions (conditional arms, short-circuit operands,
//! and operands that follow a non-value sibling) only `return e` callees are
//! inlined, by substituting the arguments into `e`. A [`CallContext`]
//! certifies that this neither duplicates, drops nor reorders an effectful
//! argument; otherwise the call is kept.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ilopt::prelude::*;
//! use rustc_hash::FxHashMap;
//!
//! let int = TypeRef::new("mscorlib", "System.Int32");
//! let ty = TypeRef::new("app", "Program");
//!
//! let id = MethodRef::new_static(ty.clone(), "Id", 1);
//! let mut callee = MethodBuilder::new(id.clone());
//! let a = callee.arg("a", int.clone());
//! callee.push(Stmt::Return(Some(Expr::read(a))));
//!
//! let main = MethodRef::new_static(ty, "Main", 1);
//! let mut caller = MethodBuilder::new(main);
//! let v = caller.arg("v", int);
//! caller.push(Stmt::Return(Some(Expr::call(id.clone(), vec![Expr::read(v)]))));
//! let caller = caller.build();
//!
//! let mut repository: FxHashMap<MethodRef, Arc<MethodBody>> = FxHashMap::default();
//! repository.insert(id, Arc::new(callee.build()));
//!
//! let policy = DefaultPolicy::new();
//! let config = SimplifierConfig::default();
//! let events = EventLog::new();
//! let simplified = Simplifier::new(&repository, &policy, &config, &events).simplify(&caller)?;
//!
//! assert_eq!(simplified.body.statements, vec![Stmt::Return(Some(Expr::read(v)))]);
//! assert!(events.has(EventKind::MethodInlined));
//! # Ok::<(), ilopt::Error>(())
//! ```

mod context;

pub use context::SimplifierContext;

use crate::{
    analysis::{Effects, Lattice, Usage},
    compiler::{
        CallContext, EventKind, EventLog, InlinePolicy, MethodRepository, SimplifierConfig,
    },
    ir::{Cell, Constant, Expr, Id, MethodBody, MethodRef, Stmt, VariableFlags},
    Result,
};

/// Output of [`Simplifier::simplify`].
#[derive(Debug, Clone)]
pub struct Simplified {
    /// The rewritten body. Fresh locals introduced by inlining are declared
    /// in its variable table.
    pub body: MethodBody,
    /// References made by the rewritten body.
    pub usage: Usage,
}

/// Rewrites method bodies, inlining calls the policy allows.
pub struct Simplifier<'a> {
    repository: &'a dyn MethodRepository,
    policy: &'a dyn InlinePolicy,
    config: &'a SimplifierConfig,
    events: &'a EventLog,
    /// Root method followed by the callees currently being inlined.
    stack: Vec<MethodRef>,
    /// Index of the top-level statement being rewritten.
    location: usize,
}

impl<'a> Simplifier<'a> {
    /// Creates a simplifier that looks callees up in `repository`.
    pub fn new(
        repository: &'a dyn MethodRepository,
        policy: &'a dyn InlinePolicy,
        config: &'a SimplifierConfig,
        events: &'a EventLog,
    ) -> Self {
        Self {
            repository,
            policy,
            config,
            events,
            stack: Vec::new(),
            location: 0,
        }
    }

    /// Simplifies `body` and returns the rewritten copy with its usage.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is inconsistent: it references
    /// undeclared variables, or writes or takes the address of a variable
    /// that a substitution maps to a non-storage expression.
    pub fn simplify(&mut self, body: &MethodBody) -> Result<Simplified> {
        let method = &body.method;
        self.events
            .record(EventKind::PassStarted)
            .method(method)
            .message(format!("{} statements", body.size()));
        if self.config.trace {
            self.events
                .record(EventKind::TraceBefore)
                .method(method)
                .message(format!("{:#?}", body.statements));
        }

        self.stack.clear();
        self.stack.push(method.clone());

        let mut variables = body.variables.clone();
        let statements = {
            let mut root = SimplifierContext::root(&mut variables, self.policy, self.events, method);
            let mut ctx = root.in_fresh_statements();
            for (location, stmt) in body.statements.iter().enumerate() {
                self.location = location;
                self.statement(&mut ctx, stmt)?;
            }
            ctx.take_statements()
        };
        self.stack.clear();

        let body = MethodBody {
            method: method.clone(),
            is_import: body.is_import,
            variables,
            statements,
        };
        let usage = body.usage();

        if self.config.trace {
            self.events
                .record(EventKind::TraceAfter)
                .method(method)
                .message(format!("{:#?}", body.statements));
        }
        self.events
            .record(EventKind::PassCompleted)
            .method(method)
            .message(format!("{} statements", body.size()));

        Ok(Simplified { body, usage })
    }

    fn block(&mut self, ctx: &mut SimplifierContext<'_>, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.statement(ctx, stmt)?;
        }
        Ok(())
    }

    fn statement(&mut self, ctx: &mut SimplifierContext<'_>, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(e) => {
                let e = self.expr(ctx, e)?;
                let effects = e.effects(ctx.vars())?;
                // Pure leftovers of inlining, e.g. the result of a void callee.
                if effects.is_read_only() && !effects.may_throw() {
                    return Ok(());
                }
                ctx.emit(Stmt::Expr(e))
            }
            Stmt::Assign(cell, value) => {
                let mut pending = false;
                let cell = self.cell(ctx, cell, &mut pending)?;
                let value = self.operand(ctx, value, &mut pending)?;
                ctx.emit(Stmt::Assign(cell, value))
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(e) => Some(self.expr(ctx, e)?),
                    None => None,
                };
                ctx.emit(Stmt::Return(value))
            }
            Stmt::Throw(e) => {
                let e = self.expr(ctx, e)?;
                ctx.emit(Stmt::Throw(e))
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(ctx, cond)?;
                let then = self.branch(ctx, then)?;
                let otherwise = self.branch(ctx, otherwise)?;
                ctx.emit(Stmt::If {
                    cond,
                    then,
                    otherwise,
                })
            }
        }
    }

    fn branch(&mut self, ctx: &mut SimplifierContext<'_>, stmts: &[Stmt]) -> Result<Vec<Stmt>> {
        let mut branch = ctx.in_fresh_statements();
        self.block(&mut branch, stmts)?;
        Ok(branch.take_statements())
    }

    /// Rewrites one of several operands evaluated left to right.
    ///
    /// Once an operand leaves a non-value behind, statements emitted for a
    /// later operand would run before it, so later operands are rewritten
    /// without a statement buffer.
    fn operand(
        &mut self,
        ctx: &mut SimplifierContext<'_>,
        e: &Expr,
        pending: &mut bool,
    ) -> Result<Expr> {
        let rewritten = if *pending && ctx.has_statements() {
            self.expr(&mut ctx.in_no_statements(), e)?
        } else {
            self.expr(ctx, e)?
        };
        if !rewritten.is_value(ctx.vars()) {
            *pending = true;
        }
        Ok(rewritten)
    }

    fn operands<'e>(
        &mut self,
        ctx: &mut SimplifierContext<'_>,
        operands: impl IntoIterator<Item = &'e Expr>,
        pending: &mut bool,
    ) -> Result<Vec<Expr>> {
        operands
            .into_iter()
            .map(|e| self.operand(ctx, e, pending))
            .collect()
    }

    fn cell(
        &mut self,
        ctx: &mut SimplifierContext<'_>,
        cell: &Cell,
        pending: &mut bool,
    ) -> Result<Cell> {
        Ok(match cell {
            Cell::Variable(id) => ctx.apply_cell(Cell::Variable(*id))?,
            Cell::Field { object, field } => Cell::Field {
                object: Box::new(self.operand(ctx, object, pending)?),
                field: field.clone(),
            },
            Cell::StaticField(field) => Cell::StaticField(field.clone()),
            Cell::Element { array, index } => {
                let array = self.operand(ctx, array, pending)?;
                let index = self.operand(ctx, index, pending)?;
                Cell::Element {
                    array: Box::new(array),
                    index: Box::new(index),
                }
            }
            Cell::Deref(pointer) => match self.operand(ctx, pointer, pending)? {
                Expr::AddressOf(target) => target,
                pointer => Cell::Deref(Box::new(pointer)),
            },
        })
    }

    fn expr(&mut self, ctx: &mut SimplifierContext<'_>, e: &Expr) -> Result<Expr> {
        let mut pending = false;
        Ok(match e {
            Expr::Const(_) => e.clone(),
            Expr::Read(Cell::Variable(id)) => ctx.apply_read_from(*id),
            Expr::Read(cell) => Expr::Read(self.cell(ctx, cell, &mut pending)?),
            Expr::AddressOf(cell) => Expr::AddressOf(self.cell(ctx, cell, &mut pending)?),
            Expr::Unary(op, operand) => Expr::Unary(*op, Box::new(self.expr(ctx, operand)?)),
            Expr::Binary(op, l, r) => {
                let l = self.operand(ctx, l, &mut pending)?;
                let r = self.operand(ctx, r, &mut pending)?;
                Expr::binary(*op, l, r)
            }
            Expr::Logical(op, l, r) => {
                let l = self.expr(ctx, l)?;
                let r = self.expr(&mut ctx.in_no_statements(), r)?;
                Expr::Logical(*op, Box::new(l), Box::new(r))
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(ctx, cond)?;
                let then = self.expr(&mut ctx.in_no_statements(), then)?;
                let otherwise = self.expr(&mut ctx.in_no_statements(), otherwise)?;
                Expr::Conditional {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                }
            }
            Expr::Call {
                method,
                receiver,
                args,
            } => {
                let actuals =
                    self.operands(ctx, receiver.as_deref().into_iter().chain(args), &mut pending)?;
                match self.try_inline(ctx, method, &actuals)? {
                    Some(inlined) => inlined,
                    None => {
                        let mut actuals = actuals.into_iter();
                        let receiver = match receiver {
                            Some(_) => actuals.next().map(Box::new),
                            None => None,
                        };
                        Expr::Call {
                            method: method.clone(),
                            receiver,
                            args: actuals.collect(),
                        }
                    }
                }
            }
            Expr::New { ctor, args } => {
                let args = self.operands(ctx, args, &mut pending)?;
                let inlined = if self.policy.is_factory(ctor) {
                    self.try_inline(ctx, ctor, &args)?
                } else {
                    None
                };
                inlined.unwrap_or_else(|| Expr::New {
                    ctor: ctor.clone(),
                    args,
                })
            }
            Expr::Export(inner) => Expr::Export(Box::new(self.expr(ctx, inner)?)),
            Expr::Import(inner) => Expr::Import(Box::new(self.expr(ctx, inner)?)),
        })
    }

    fn reject(&self, ctx: &SimplifierContext<'_>, callee: &MethodRef, reason: &str) {
        ctx.events()
            .record(EventKind::InlineRejected)
            .method(ctx.method())
            .location(self.location)
            .message(format!("{callee}: {reason}"));
    }

    /// Returns the inlined replacement for a call of `method` with `actuals`
    /// (receiver first), or `None` if the call must stay.
    fn try_inline(
        &mut self,
        ctx: &mut SimplifierContext<'_>,
        method: &MethodRef,
        actuals: &[Expr],
    ) -> Result<Option<Expr>> {
        if !self.config.enable_inlining
            || self.stack.len() > self.config.max_inline_depth
            || self.stack.contains(method)
        {
            return Ok(None);
        }
        let Some(callee) = self.repository.method_body(method) else {
            return Ok(None);
        };

        if callee.size() > self.config.max_inline_statements {
            self.reject(ctx, method, "body too large");
            return Ok(None);
        }
        let allowed = if callee.is_import {
            self.policy.is_inlinable_import(method, &callee)
        } else {
            self.policy.is_inlinable(method, &callee)
        };
        if !allowed {
            self.reject(ctx, method, "not inlinable");
            return Ok(None);
        }
        let parameters = callee.parameters();
        if parameters.len() != actuals.len() {
            self.reject(ctx, method, "arity mismatch");
            return Ok(None);
        }

        let actuals: Vec<Expr> = if callee.is_import {
            actuals
                .iter()
                .enumerate()
                .map(|(i, actual)| {
                    if self.policy.suppress_param_marshalling(method, i) {
                        actual.clone()
                    } else {
                        Expr::Export(Box::new(actual.clone()))
                    }
                })
                .collect()
        } else {
            actuals.to_vec()
        };

        self.stack.push(method.clone());
        let inlined = if ctx.has_statements() {
            self.inline_statements(ctx, &callee, &parameters, &actuals)
        } else {
            self.inline_expression(ctx, &callee, &parameters, &actuals)
        };
        self.stack.pop();

        let Some(result) = inlined? else {
            return Ok(None);
        };
        ctx.events()
            .record(EventKind::MethodInlined)
            .method(ctx.method())
            .location(self.location)
            .message(method.to_string());

        let returns_value = matches!(callee.statements.last(), Some(Stmt::Return(Some(_))));
        if callee.is_import && returns_value && !self.policy.suppress_return_marshalling(method) {
            return Ok(Some(Expr::Import(Box::new(result))));
        }
        Ok(Some(result))
    }

    /// Splices `callee` into the open statement buffer.
    fn inline_statements(
        &mut self,
        ctx: &mut SimplifierContext<'_>,
        callee: &MethodBody,
        parameters: &[Id],
        actuals: &[Expr],
    ) -> Result<Option<Expr>> {
        let Some((init, ret)) = callee.split_trailing_return() else {
            self.reject(ctx, &callee.method, "return before the end of the body");
            return Ok(None);
        };

        let mut effects = Vec::with_capacity(actuals.len());
        let mut values = Vec::with_capacity(actuals.len());
        for actual in actuals {
            effects.push(actual.effects(ctx.vars())?);
            values.push(actual.is_value(ctx.vars()));
        }

        let mut sub = ctx.in_sub_method();
        for (i, (&param, actual)) in parameters.iter().zip(actuals).enumerate() {
            let declared = callee.variables.get(param)?;
            let direct = values[i]
                && !declared.flags.contains(VariableFlags::ADDRESS_TAKEN)
                && !assigns(&callee.statements, param)
                && commutes_with_others(&effects, &values, i);
            if direct {
                sub.bind(param, actual.clone());
            } else {
                let fresh = sub.freshen_argument(param, declared.ty.clone(), declared.flags);
                sub.emit(Stmt::assign(fresh, actual.clone()))?;
            }
        }
        sub.freshen_locals(&callee.variables)?;

        self.block(&mut sub, init)?;
        let result = match ret {
            Some(e) => self.expr(&mut sub, e)?,
            None => Expr::Const(Constant::Null),
        };

        let statements = sub.take_statements();
        let spliced = sub.effects().clone();
        drop(sub);
        for stmt in statements {
            ctx.add(stmt)?;
        }
        ctx.include_effects(&spliced);
        Ok(Some(result))
    }

    /// Substitutes `actuals` into the single return expression of `callee`.
    fn inline_expression(
        &mut self,
        ctx: &mut SimplifierContext<'_>,
        callee: &MethodBody,
        parameters: &[Id],
        actuals: &[Expr],
    ) -> Result<Option<Expr>> {
        let Some(body) = callee.single_return() else {
            self.reject(ctx, &callee.method, "not a single return");
            return Ok(None);
        };
        let needs_storage = callee.variables.locals().next().is_some()
            || parameters.iter().any(|&p| {
                callee
                    .variables
                    .get(p)
                    .is_ok_and(|v| v.flags.contains(VariableFlags::ADDRESS_TAKEN))
            });
        if needs_storage {
            self.reject(ctx, &callee.method, "needs storage in expression context");
            return Ok(None);
        }

        let call = CallContext::new(ctx.vars(), parameters, actuals)?;
        let mut substitution = Substitution {
            call,
            actuals,
            scan: ctx.in_local_effects(),
        };
        let result = substitution.expr(body, true)?;
        let Substitution { mut call, .. } = substitution;

        if !call.finish() {
            self.reject(ctx, &callee.method, "arguments cannot be moved");
            return Ok(None);
        }
        Ok(Some(result))
    }
}

/// `true` if `effects[i]` commutes with every other non-value argument.
fn commutes_with_others(effects: &[Effects], values: &[bool], i: usize) -> bool {
    effects
        .iter()
        .zip(values)
        .enumerate()
        .filter(|&(j, (_, &value))| j != i && !value)
        .all(|(_, (other, _))| other.commutable_with(&effects[i]))
}

/// `true` if some statement assigns variable `id` directly.
fn assigns(stmts: &[Stmt], id: Id) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Assign(Cell::Variable(target), _) => *target == id,
        Stmt::If {
            then, otherwise, ..
        } => assigns(then, id) || assigns(otherwise, id),
        _ => false,
    })
}

/// Walk of a callee return expression in evaluation order, replacing
/// parameters with the actual arguments and reporting each occurrence to
/// the call context.
struct Substitution<'s, 'c> {
    call: CallContext,
    actuals: &'s [Expr],
    scan: SimplifierContext<'c>,
}

impl Substitution<'_, '_> {
    /// Accounts for the work of `node` itself, operands excluded.
    fn own(&mut self, node: Expr) -> Result<Expr> {
        let mut effects = Effects::bottom(self.scan.vars().frame());
        node.accum_own_effects(self.scan.vars(), &mut effects)?;
        self.scan.include_effects(&effects);
        Ok(node)
    }

    fn boxed(&mut self, e: &Expr, unconditional: bool) -> Result<Box<Expr>> {
        self.expr(e, unconditional).map(Box::new)
    }

    fn expr(&mut self, e: &Expr, unconditional: bool) -> Result<Expr> {
        let rebuilt = match e {
            Expr::Read(Cell::Variable(id)) => {
                let Some(index) = self.call.parameter_index(*id) else {
                    return Err(malformed_error!("callee reads undeclared {}", id));
                };
                self.call
                    .visit_parameter(index, self.scan.effects(), unconditional);
                return Ok(self.actuals[index].clone());
            }
            Expr::Const(_) => e.clone(),
            Expr::Read(cell) => Expr::Read(self.cell(cell, unconditional)?),
            Expr::AddressOf(cell) => Expr::AddressOf(self.cell(cell, unconditional)?),
            Expr::Unary(op, operand) => Expr::Unary(*op, self.boxed(operand, unconditional)?),
            Expr::Binary(op, l, r) => {
                Expr::Binary(*op, self.boxed(l, unconditional)?, self.boxed(r, unconditional)?)
            }
            Expr::Logical(op, l, r) => {
                Expr::Logical(*op, self.boxed(l, unconditional)?, self.boxed(r, false)?)
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => Expr::Conditional {
                cond: self.boxed(cond, unconditional)?,
                then: self.boxed(then, false)?,
                otherwise: self.boxed(otherwise, false)?,
            },
            Expr::Call {
                method,
                receiver,
                args,
            } => {
                let receiver = match receiver {
                    Some(r) => Some(self.boxed(r, unconditional)?),
                    None => None,
                };
                let args = args
                    .iter()
                    .map(|a| self.expr(a, unconditional))
                    .collect::<Result<_>>()?;
                Expr::Call {
                    method: method.clone(),
                    receiver,
                    args,
                }
            }
            Expr::New { ctor, args } => Expr::New {
                ctor: ctor.clone(),
                args: args
                    .iter()
                    .map(|a| self.expr(a, unconditional))
                    .collect::<Result<_>>()?,
            },
            Expr::Export(inner) => Expr::Export(self.boxed(inner, unconditional)?),
            Expr::Import(inner) => Expr::Import(self.boxed(inner, unconditional)?),
        };
        self.own(rebuilt)
    }

    fn cell(&mut self, cell: &Cell, unconditional: bool) -> Result<Cell> {
        Ok(match cell {
            Cell::Variable(id) => {
                return Err(malformed_error!("callee parameter {} used as storage", id));
            }
            Cell::Field { object, field } => Cell::Field {
                object: self.boxed(object, unconditional)?,
                field: field.clone(),
            },
            Cell::StaticField(field) => Cell::StaticField(field.clone()),
            Cell::Element { array, index } => Cell::Element {
                array: self.boxed(array, unconditional)?,
                index: self.boxed(index, unconditional)?,
            },
            Cell::Deref(pointer) => Cell::Deref(self.boxed(pointer, unconditional)?),
        })
    }
}
