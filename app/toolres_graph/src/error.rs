/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use itertools::Itertools;

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq, Hash)]
pub enum GraphError {
    /// The request would make a computation depend on itself. `path` lists the keys
    /// from the requested key back to itself.
    #[error("Cycle detected when computing `{}`: {}", .path.first().map_or("", |k| k.as_str()), .path.iter().join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("No value was injected for `{key}`")]
    MissingValue { key: String },
}
