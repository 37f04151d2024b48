/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Toolchain resolution: given the toolchain types a target requires, choose an
//! execution platform and one toolchain implementation per type.
//!
//! Everything the resolution reads (configuration, declarations, platforms,
//! registrations) is requested through a [`toolres_graph::DepsEnv`], so a
//! resolution can be suspended while those are computed and restarted later.
//! The entry points are [`resolve_toolchains`] and [`ToolchainContextKey`].

pub mod binder;
pub mod configuration;
pub mod context;
pub mod declaration;
pub mod error;
pub mod execution;
pub mod lookup;
pub mod registration;
pub mod resolution;

pub use context::ToolchainContext;
pub use error::ToolchainResolutionError;
pub use resolution::resolve_toolchains;
pub use resolution::ResolutionRequest;
pub use resolution::ToolchainContextKey;
