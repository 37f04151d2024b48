/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::task::Poll;

use crate::error::GraphError;
use crate::key::InjectedKey;
use crate::key::Key;

/// The dependency-access handle passed to [`Key::compute`].
///
/// Requests record a dependency of the running computation. A `Poll::Pending`
/// answer means the value does not exist yet; the graph will compute it and then
/// re-run the requesting computation.
pub trait DepsEnv {
    /// Request the value of a computed key.
    ///
    /// `Err` is a failure of the graph itself (e.g. the request closes a cycle),
    /// not a failure of the requested computation: those are part of its value.
    fn request<K: Key>(&mut self, key: &K) -> Poll<Result<K::Value, GraphError>>;

    /// Read an injected value. These never suspend.
    fn injected<K: InjectedKey>(&mut self, key: &K) -> Result<K::Value, GraphError>;

    /// Request several keys at once.
    ///
    /// Every key is requested even if an earlier one is pending, so that a single
    /// restart is enough to make all of them available.
    fn request_many<K: Key>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
    ) -> Poll<Vec<Result<K::Value, GraphError>>> {
        let mut values = Vec::new();
        let mut pending = false;
        for key in keys {
            match self.request(&key) {
                Poll::Ready(v) => values.push(v),
                Poll::Pending => pending = true,
            }
        }
        if pending {
            Poll::Pending
        } else {
            Poll::Ready(values)
        }
    }
}
