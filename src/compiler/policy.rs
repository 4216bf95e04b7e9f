//! Inlining policy and callee lookup.
//!
//! The simplifier never decides on its own which callees are worth inlining;
//! it asks an [`InlinePolicy`]. It only certifies that a substitution the
//! policy allows is semantics-preserving, and performs it.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::{MethodBody, MethodRef};

/// Oracle gating inlining and interop marshalling decisions.
pub trait InlinePolicy: Send + Sync {
    /// Is a managed callee small and simple enough to inline?
    fn is_inlinable(&self, method: &MethodRef, body: &MethodBody) -> bool;

    /// Is an imported callee small and simple enough to inline?
    fn is_inlinable_import(&self, method: &MethodRef, body: &MethodBody) -> bool;

    /// May this constructor be treated as a static factory: no implicit
    /// receiver, and its body returns the constructed instance?
    fn is_factory(&self, ctor: &MethodRef) -> bool;

    /// Should argument `index` of a call to `method` skip interop marshalling?
    fn suppress_param_marshalling(&self, method: &MethodRef, index: usize) -> bool;

    /// Should the result of a call to `method` skip interop marshalling?
    fn suppress_return_marshalling(&self, method: &MethodRef) -> bool;
}

/// Source of callee bodies.
pub trait MethodRepository: Sync {
    /// Returns the body of `method`, if known.
    fn method_body(&self, method: &MethodRef) -> Option<Arc<MethodBody>>;
}

impl MethodRepository for FxHashMap<MethodRef, Arc<MethodBody>> {
    fn method_body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
        self.get(method).cloned()
    }
}

/// Policy that allows every callee the configured limits allow.
///
/// Constructors are only factories, and marshalling is only suppressed, for
/// the methods registered here.
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicy {
    inline_imports: bool,
    factories: FxHashSet<MethodRef>,
    unmarshalled: FxHashSet<MethodRef>,
    blocked: FxHashSet<MethodRef>,
}

impl DefaultPolicy {
    /// Creates a policy that inlines managed callees but not imported ones.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also inline imported callees.
    #[must_use]
    pub fn with_imports(mut self) -> Self {
        self.inline_imports = true;
        self
    }

    /// Treats `ctor` as a factory.
    #[must_use]
    pub fn with_factory(mut self, ctor: MethodRef) -> Self {
        self.factories.insert(ctor);
        self
    }

    /// Passes arguments to and results from `method` without marshalling.
    #[must_use]
    pub fn without_marshalling(mut self, method: MethodRef) -> Self {
        self.unmarshalled.insert(method);
        self
    }

    /// Never inlines `method`.
    #[must_use]
    pub fn block(mut self, method: MethodRef) -> Self {
        self.blocked.insert(method);
        self
    }
}

impl InlinePolicy for DefaultPolicy {
    fn is_inlinable(&self, method: &MethodRef, _body: &MethodBody) -> bool {
        !self.blocked.contains(method)
    }

    fn is_inlinable_import(&self, method: &MethodRef, _body: &MethodBody) -> bool {
        self.inline_imports && !self.blocked.contains(method)
    }

    fn is_factory(&self, ctor: &MethodRef) -> bool {
        self.factories.contains(ctor)
    }

    fn suppress_param_marshalling(&self, method: &MethodRef, _index: usize) -> bool {
        self.unmarshalled.contains(method)
    }

    fn suppress_return_marshalling(&self, method: &MethodRef) -> bool {
        self.unmarshalled.contains(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{MethodBuilder, TypeRef};

    #[test]
    fn test_default_policy() {
        let ty = TypeRef::new("app", "P");
        let f = MethodRef::new_static(ty.clone(), "f", 0);
        let g = MethodRef::new_static(ty.clone(), "g", 0);
        let ctor = MethodRef::ctor(ty, 0);
        let body = MethodBuilder::new(f.clone()).build();

        let policy = DefaultPolicy::new()
            .with_factory(ctor.clone())
            .without_marshalling(g.clone())
            .block(g.clone());

        assert!(policy.is_inlinable(&f, &body));
        assert!(!policy.is_inlinable(&g, &body));
        assert!(!policy.is_inlinable_import(&f, &body));
        assert!(policy.clone().with_imports().is_inlinable_import(&f, &body));
        assert!(policy.is_factory(&ctor));
        assert!(policy.suppress_param_marshalling(&g, 0));
        assert!(!policy.suppress_return_marshalling(&f));
    }

    #[test]
    fn test_map_repository() {
        let f = MethodRef::new_static(TypeRef::new("app", "P"), "f", 0);
        let mut repo: FxHashMap<MethodRef, Arc<MethodBody>> = FxHashMap::default();
        repo.insert(f.clone(), Arc::new(MethodBuilder::new(f.clone()).build()));
        assert!(repo.method_body(&f).is_some());
        let g = MethodRef::new_static(TypeRef::new("app", "P"), "g", 0);
        assert!(repo.method_body(&g).is_none());
    }
}
