//! Configuration for the simplifier.

/// Knobs controlling inlining and diagnostics.
///
/// These bound the work the pass does; the inlining policy still decides
/// which callees are candidates at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplifierConfig {
    /// Inline calls at all (default: `true`).
    pub enable_inlining: bool,

    /// Maximum nesting of inlining inside inlined bodies (default: 4).
    pub max_inline_depth: usize,

    /// Maximum callee body size in statements, nested ones included (default: 16).
    pub max_inline_statements: usize,

    /// Record before/after IR dumps in the event log (default: `false`).
    pub trace: bool,

    /// Simplify independent methods on the rayon pool (default: `true`).
    pub parallel: bool,
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        Self {
            enable_inlining: true,
            max_inline_depth: 4,
            max_inline_statements: 16,
            trace: false,
            parallel: true,
        }
    }
}

impl SimplifierConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that rewrites substitutions but never inlines.
    #[must_use]
    pub fn no_inlining() -> Self {
        Self {
            enable_inlining: false,
            ..Self::default()
        }
    }

    /// Sets [`enable_inlining`](Self::enable_inlining).
    #[must_use]
    pub fn with_inlining(mut self, enable: bool) -> Self {
        self.enable_inlining = enable;
        self
    }

    /// Sets [`max_inline_depth`](Self::max_inline_depth).
    #[must_use]
    pub fn with_max_inline_depth(mut self, depth: usize) -> Self {
        self.max_inline_depth = depth;
        self
    }

    /// Sets [`max_inline_statements`](Self::max_inline_statements).
    #[must_use]
    pub fn with_max_inline_statements(mut self, statements: usize) -> Self {
        self.max_inline_statements = statements;
        self
    }

    /// Sets [`trace`](Self::trace).
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Sets [`parallel`](Self::parallel).
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
