/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Core data model for platforms and toolchains: target labels, constraint
//! settings and values, platforms, and the compatibility check between a
//! platform and a set of required constraint values.

pub mod configuration;
pub mod target;
