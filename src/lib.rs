// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # ilopt
//!
//! The optimization core of a bytecode-to-JavaScript compiler. `ilopt` decides, for every
//! call site, whether replacing the call with the callee's body preserves the program's
//! behaviour, and performs the rewriting when it does.
//!
//! The crate operates on an already structured intermediate representation ([`ir`]): method
//! bodies made of statements and expressions over numbered arguments and locals. Loading
//! assemblies, recovering structured control flow and emitting JavaScript happen elsewhere.
//!
//! ## Features
//!
//! - **Abstract interpretation** - finite-height lattices with joins and fixed points
//! - **Effects and points-to** - what an expression may read, write, point to or raise
//! - **Safe inlining** - arguments are never duplicated, dropped or reordered observably
//! - **Usage tracking** - definite versus possible references to assemblies, types and members
//! - **Parallel driver** - independent methods are simplified concurrently
//!
//! ## Quick Start
//!
//! ```rust
//! use ilopt::prelude::*;
//!
//! let int = TypeRef::new("mscorlib", "System.Int32");
//! let ty = TypeRef::new("app", "Program");
//!
//! // static int Add(int a, int b) => a + b;
//! let add = MethodRef::new_static(ty.clone(), "Add", 2);
//! let mut b = MethodBuilder::new(add.clone());
//! let a = b.arg("a", int.clone());
//! let c = b.arg("b", int.clone());
//! b.push(Stmt::Return(Some(Expr::binary(BinaryOp::Add, Expr::read(a), Expr::read(c)))));
//!
//! // static int Main(int v) => Add(v, 1);
//! let main = MethodRef::new_static(ty, "Main", 1);
//! let mut m = MethodBuilder::new(main.clone());
//! let v = m.arg("v", int);
//! m.push(Stmt::Return(Some(Expr::call(add, vec![Expr::read(v), Expr::int(1)]))));
//!
//! let context = CompilerContext::new();
//! context.add_method(b.build());
//! context.add_method(m.build());
//! context.simplify_all(&DefaultPolicy::new())?;
//!
//! let main = context.get(&main).unwrap();
//! assert_eq!(
//!     main.statements,
//!     vec![Stmt::Return(Some(Expr::binary(BinaryOp::Add, Expr::read(v), Expr::int(1))))]
//! );
//! # Ok::<(), ilopt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`analysis`] - Lattices, effects, points-to, usage and logic variables
//! - [`ir`] - The intermediate representation and its effect and usage queries
//! - [`compiler`] - Call contexts, the simplifier and the multi-method driver
//! - [`utils`] - Supporting data structures
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! A call that cannot be inlined safely is not an error: it is left alone and an
//! [`compiler::EventKind::InlineRejected`] event is recorded. Errors signal inconsistent
//! input or misuse of a rewriting context:
//!
//! ```rust
//! use ilopt::{analysis::LogicArena, Error};
//!
//! let mut arena = LogicArena::new();
//! let var = arena.fresh();
//! arena.bind(var, 1)?;
//! assert!(matches!(arena.bind(var, 2), Err(Error::LogicVarBound)));
//! # Ok::<(), ilopt::Error>(())
//! ```

#[macro_use]
pub(crate) mod error;

pub mod analysis;
pub mod compiler;
pub mod ir;
pub mod prelude;
pub mod utils;

/// `ilopt` Result type
pub type Result<T> = std::result::Result<T, Error>;

/// `ilopt` Error type
pub use error::Error;
