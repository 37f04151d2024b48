/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The contract between a demand-driven, memoizing computation graph and the
//! computations that run inside it.
//!
//! A computation is a [`Key`]. Its `compute` function reads everything it needs
//! through a [`DepsEnv`], and every read is a *request*: it either yields the
//! value right away or reports that the value has not been computed yet. When
//! anything is missing the computation returns [`Poll::Pending`], and the graph
//! runs it again from the beginning once the missing values exist. Computations
//! must therefore have no side effects before returning their final value.
//!
//! Values that come from outside the graph (build configuration, loaded target
//! declarations) are [`InjectedKey`]s and are always available or absent.
//!
//! [`Evaluator`] is a small driver that implements the contract: it memoizes
//! values by key, re-drives suspended computations and reports dependency
//! cycles to the computation that closed the cycle.
//!
//! ```
//! use std::task::Poll;
//! use std::task::ready;
//!
//! use allocative::Allocative;
//! use derive_more::Display;
//! use toolres_graph::DepsEnv;
//! use toolres_graph::Evaluator;
//! use toolres_graph::InjectedKey;
//! use toolres_graph::Key;
//!
//! #[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Allocative)]
//! struct Base;
//!
//! impl InjectedKey for Base {
//!     type Value = u32;
//! }
//!
//! #[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Allocative)]
//! #[display("Double({})", _0)]
//! struct Double(u32);
//!
//! impl Key for Double {
//!     type Value = u32;
//!
//!     fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<u32> {
//!         let base = env.injected(&Base).unwrap_or(0);
//!         Poll::Ready(base + self.0 * 2)
//!     }
//! }
//!
//! #[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Allocative)]
//! struct Sum;
//!
//! impl Key for Sum {
//!     type Value = u32;
//!
//!     fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<u32> {
//!         let values = ready!(env.request_many([Double(1), Double(2)]));
//!         Poll::Ready(values.into_iter().map(|v| v.unwrap()).sum())
//!     }
//! }
//!
//! let evaluator = Evaluator::new();
//! evaluator.inject(Base, 10);
//! assert_eq!(26, evaluator.compute(&Sum));
//! ```
//!
//! [`Poll::Pending`]: std::task::Poll::Pending

mod env;
mod erased;
mod error;
mod evaluator;
mod key;

pub use env::DepsEnv;
pub use error::GraphError;
pub use evaluator::Evaluator;
pub use key::InjectedKey;
pub use key::Key;
