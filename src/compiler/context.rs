//! Shared state for simplifying many methods.
//!
//! A [`CompilerContext`] owns every method body of a compilation unit. Its
//! [`simplify_all`](CompilerContext::simplify_all) runs the
//! [`Simplifier`] over each method independently: every method gets its own
//! simplifier and context tree, and callees are taken from a snapshot of the
//! bodies as they were before the pass, so the result does not depend on
//! scheduling. All collections are concurrent, and methods are processed on
//! the rayon pool when [`SimplifierConfig::parallel`] is set.
//!
//! # Examples
//!
//! ```rust
//! use ilopt::prelude::*;
//!
//! let int = TypeRef::new("mscorlib", "System.Int32");
//! let ty = TypeRef::new("app", "Program");
//! let one = MethodRef::new_static(ty.clone(), "One", 0);
//!
//! let mut b = MethodBuilder::new(one.clone());
//! b.push(Stmt::Return(Some(Expr::int(1))));
//! let callee = b.build();
//!
//! let main = MethodRef::new_static(ty, "Main", 0);
//! let mut b = MethodBuilder::new(main.clone());
//! let x = b.local("x", int);
//! b.push(Stmt::assign(x, Expr::call(one.clone(), vec![])));
//!
//! let context = CompilerContext::new();
//! context.add_method(callee);
//! context.add_method(b.build());
//! context.simplify_all(&DefaultPolicy::new())?;
//!
//! let main = context.get(&main).unwrap();
//! assert_eq!(main.statements, vec![Stmt::assign(x, Expr::int(1))]);
//! assert_eq!(context.total_usage().method(&one), None);
//! # Ok::<(), ilopt::Error>(())
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::{
    analysis::Usage,
    compiler::{
        EventKind, EventLog, InlinePolicy, MethodRepository, Simplifier, SimplifierConfig,
    },
    ir::{MethodBody, MethodRef},
    Result,
};

/// Method bodies, per-method results and the shared event log.
pub struct CompilerContext {
    /// Current body of each method.
    pub methods: DashMap<MethodRef, MethodBody>,

    /// Usage of each simplified body.
    pub usages: DashMap<MethodRef, Usage>,

    /// Event log shared by all passes.
    pub events: EventLog,

    config: SimplifierConfig,
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerContext {
    /// Creates an empty context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimplifierConfig::default())
    }

    /// Creates an empty context with a custom configuration.
    #[must_use]
    pub fn with_config(config: SimplifierConfig) -> Self {
        Self {
            methods: DashMap::new(),
            usages: DashMap::new(),
            events: EventLog::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SimplifierConfig {
        &self.config
    }

    /// Adds or replaces a method body.
    pub fn add_method(&self, body: MethodBody) {
        self.usages.remove(&body.method);
        self.methods.insert(body.method.clone(), body);
    }

    /// Returns a copy of the current body of `method`.
    #[must_use]
    pub fn get(&self, method: &MethodRef) -> Option<MethodBody> {
        self.methods.get(method).map(|entry| entry.value().clone())
    }

    /// Returns `true` if a body is registered for `method`.
    #[must_use]
    pub fn contains(&self, method: &MethodRef) -> bool {
        self.methods.contains_key(method)
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    fn snapshot(&self) -> FxHashMap<MethodRef, Arc<MethodBody>> {
        self.methods
            .iter()
            .map(|entry| (entry.key().clone(), Arc::new(entry.value().clone())))
            .collect()
    }

    /// Simplifies every registered method under `policy`.
    ///
    /// Callees are inlined as they were before this call. A method whose
    /// simplification fails keeps its body, gets an [`EventKind::Error`]
    /// event and no usage; the other methods are still simplified.
    ///
    /// # Errors
    ///
    /// Returns the first per-method failure, after all methods were processed.
    pub fn simplify_all(&self, policy: &dyn InlinePolicy) -> Result<()> {
        let snapshot = self.snapshot();
        let mut methods: Vec<&MethodRef> = snapshot.keys().collect();
        // Deterministic event and error order in sequential mode.
        methods.sort_by_key(|m| m.to_string());

        let simplify_one = |method: &MethodRef| -> Result<()> {
            let Some(body) = snapshot.get(method) else {
                return Ok(());
            };
            self.usages.remove(method);
            let simplified =
                Simplifier::new(&snapshot, policy, &self.config, &self.events).simplify(body)?;
            self.usages.insert(method.clone(), simplified.usage);
            self.methods.insert(method.clone(), simplified.body);
            Ok(())
        };

        let results: Vec<(&MethodRef, Result<()>)> = if self.config.parallel {
            methods
                .par_iter()
                .map(|&method| (method, simplify_one(method)))
                .collect()
        } else {
            methods
                .iter()
                .map(|&method| (method, simplify_one(method)))
                .collect()
        };

        let mut first = None;
        for (method, result) in results {
            if let Err(error) = result {
                self.events
                    .record(EventKind::Error)
                    .method(method)
                    .message(error.to_string());
                first.get_or_insert(error);
            }
        }
        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Usage of the simplified body of `method`.
    #[must_use]
    pub fn usage_of(&self, method: &MethodRef) -> Option<Usage> {
        self.usages.get(method).map(|entry| entry.value().clone())
    }

    /// Sequential merge of the usage of every simplified method.
    #[must_use]
    pub fn total_usage(&self) -> Usage {
        let mut total = Usage::new();
        for entry in &self.usages {
            total.merge(entry.value(), true);
        }
        total
    }
}

impl MethodRepository for CompilerContext {
    fn method_body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
        self.get(method).map(Arc::new)
    }
}
