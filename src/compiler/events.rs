//! Structured event log for the simplifier.
//!
//! The log is the crate's diagnostic channel. Passes record what they did
//! (inlined a call, rejected one, introduced fresh locals) and, when tracing
//! is enabled, before/after dumps of the IR. It is append-only and safe to
//! share between worker threads; recording never affects results.
//!
//! # Examples
//!
//! ```rust
//! use ilopt::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::Info).message("starting");
//! log.record(EventKind::MethodInlined).location(3).message("inlined f");
//!
//! assert_eq!(log.len(), 2);
//! assert!(log.has(EventKind::MethodInlined));
//! assert_eq!(log.transformations(), 1);
//! ```

use std::fmt::{self, Write as _};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::ir::MethodRef;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum EventKind {
    /// A pass started on a method.
    PassStarted,
    /// A pass finished on a method.
    PassCompleted,
    /// A call was replaced by the callee's body.
    MethodInlined,
    /// A call was considered and left alone.
    InlineRejected,
    /// An argument was bound to a fresh local.
    ArgumentFreshened,
    /// The locals of an inlined body were renamed.
    LocalsFreshened,
    /// IR dump before a pass.
    TraceBefore,
    /// IR dump after a pass.
    TraceAfter,
    /// Informational message.
    Info,
    /// Something unexpected that did not stop the pass.
    Warning,
    /// A pass failed for a method.
    Error,
}

impl EventKind {
    /// Returns `true` for kinds that describe a change to the IR.
    #[must_use]
    pub fn is_transformation(self) -> bool {
        matches!(
            self,
            Self::MethodInlined | Self::ArgumentFreshened | Self::LocalsFreshened
        )
    }

    /// Short human-readable label.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::MethodInlined => "method inlined",
            Self::InlineRejected => "inline rejected",
            Self::ArgumentFreshened => "argument freshened",
            Self::LocalsFreshened => "locals freshened",
            Self::TraceBefore => "before",
            Self::TraceAfter => "after",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Kind.
    pub kind: EventKind,
    /// Method being processed, if any.
    pub method: Option<MethodRef>,
    /// Statement index within the method, if meaningful.
    pub location: Option<usize>,
    /// Free-form detail.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind.description())?;
        if let Some(method) = &self.method {
            write!(f, " {method}")?;
        }
        if let Some(location) = self.location {
            write!(f, " @{location}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Append-only, thread-safe event collection.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts recording an event; it is committed when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Some(Event {
                kind,
                method: None,
                location: None,
                message: String::new(),
            }),
        }
    }

    /// Appends a complete event.
    pub fn push(&self, event: Event) {
        self.events.push(event);
    }

    /// Appends every event of `other`.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in other.events.iter() {
            self.events.push(event.clone());
        }
    }

    /// Moves all events out, leaving the log empty.
    #[must_use]
    pub fn take(&mut self) -> EventLog {
        std::mem::take(self)
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns `true` if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Number of events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Events of `kind`.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Events recorded for `method`.
    pub fn filter_method<'a>(&'a self, method: &'a MethodRef) -> impl Iterator<Item = &'a Event> {
        self.iter().filter(move |e| e.method.as_ref() == Some(method))
    }

    /// Number of events that changed the IR.
    #[must_use]
    pub fn transformations(&self) -> usize {
        self.iter().filter(|e| e.kind.is_transformation()).count()
    }

    /// One line per non-empty kind: `label: count`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut counts = [0usize; EventKind::COUNT];
        for event in self.iter() {
            counts[event.kind as usize] += 1;
        }
        let mut out = String::new();
        for kind in EventKind::iter() {
            let n = counts[kind as usize];
            if n > 0 {
                let _ = writeln!(out, "{}: {n}", kind.description());
            }
        }
        out
    }
}

/// Fluent builder returned by [`EventLog::record`].
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Option<Event>,
}

impl EventBuilder<'_> {
    /// Attaches the method being processed.
    #[must_use]
    pub fn method(mut self, method: &MethodRef) -> Self {
        if let Some(e) = self.event.as_mut() {
            e.method = Some(method.clone());
        }
        self
    }

    /// Attaches a statement index.
    #[must_use]
    pub fn location(mut self, location: usize) -> Self {
        if let Some(e) = self.event.as_mut() {
            e.location = Some(location);
        }
        self
    }

    /// Sets the message and commits.
    pub fn message(mut self, message: impl Into<String>) {
        if let Some(e) = self.event.as_mut() {
            e.message = message.into();
        }
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            self.log.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeRef;

    fn method(name: &str) -> MethodRef {
        MethodRef::new_static(TypeRef::new("app", "P"), name, 0)
    }

    #[test]
    fn test_builder_commits_on_drop() {
        let log = EventLog::new();
        let _ = log.record(EventKind::Warning).method(&method("f"));
        assert_eq!(log.len(), 1);
        let event = log.iter().next().unwrap();
        assert_eq!(event.kind, EventKind::Warning);
        assert_eq!(event.method, Some(method("f")));
        assert!(event.message.is_empty());
    }

    #[test]
    fn test_queries() {
        let log = EventLog::new();
        let f = method("f");
        let g = method("g");
        log.record(EventKind::MethodInlined).method(&f).message("g");
        log.record(EventKind::InlineRejected).method(&f).message("h");
        log.record(EventKind::LocalsFreshened).method(&g).message("2");

        assert_eq!(log.count_kind(EventKind::MethodInlined), 1);
        assert_eq!(log.filter_method(&f).count(), 2);
        assert_eq!(log.filter_kind(EventKind::LocalsFreshened).count(), 1);
        assert_eq!(log.transformations(), 2);
        assert!(!log.has(EventKind::Error));

        let summary = log.summary();
        assert!(summary.contains("method inlined: 1"));
        assert!(!summary.contains("error"));
    }

    #[test]
    fn test_merge_and_take() {
        let a = EventLog::new();
        let mut b = EventLog::new();
        b.record(EventKind::Info).message("x");
        a.merge(&b);
        assert_eq!(a.len(), 1);

        let taken = b.take();
        assert!(b.is_empty());
        assert_eq!(taken.len(), 1);
    }

    #[test]
    fn test_display() {
        let log = EventLog::new();
        log.record(EventKind::MethodInlined)
            .method(&method("f"))
            .location(2)
            .message("g");
        let text = log.iter().next().unwrap().to_string();
        assert_eq!(text, "[method inlined] [app]P::f/0 @2: g");
    }
}
