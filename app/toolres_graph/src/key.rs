/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;
use std::task::Poll;

use allocative::Allocative;

use crate::env::DepsEnv;

/// A computation in the graph. Equal keys share one memoized value.
pub trait Key: Allocative + Debug + Display + Clone + Eq + Hash + Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Compute the value of this key.
    ///
    /// Return `Poll::Pending` when any value requested from `env` was not available.
    /// The computation is then restarted from the beginning once those values have
    /// been computed, so it must not have observable side effects.
    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value>;
}

/// A value set from outside the graph rather than computed in it.
pub trait InjectedKey:
    Allocative + Debug + Display + Clone + Eq + Hash + Send + Sync + 'static
{
    type Value: Clone + Send + Sync + 'static;
}
