//! Call inlining and substitution-based simplification.
//!
//! This module is the rewriting half of the crate; [`crate::analysis`]
//! supplies the domains it reasons with and [`crate::ir`] the code it
//! rewrites.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Simplification Pipeline                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilerContext              Shared multi-method state          │
//! │    ├─ Method bodies           (DashMap, snapshot per run)        │
//! │    ├─ Per-method usage                                           │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  Simplifier                   One method at a time               │
//! │    ├─ SimplifierContext       substitution, statements, effects  │
//! │    ├─ CallContext             argument movement legality         │
//! │    └─ InlinePolicy            which callees are candidates       │
//! │                                                                  │
//! │  SimplifierConfig             depth/size ceilings, tracing       │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod callctx;
mod config;
mod context;
mod events;
mod policy;
mod simplifier;

pub use callctx::CallContext;
pub use config::SimplifierConfig;
pub use context::CompilerContext;
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use policy::{DefaultPolicy, InlinePolicy, MethodRepository};
pub use simplifier::{Simplified, Simplifier, SimplifierContext};
