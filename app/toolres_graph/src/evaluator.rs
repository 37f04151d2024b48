/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::HashMap;
use std::iter;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::Poll;

use dupe::Dupe;
use parking_lot::RwLock;

use crate::env::DepsEnv;
use crate::erased::AnyKey;
use crate::erased::AnyValue;
use crate::error::GraphError;
use crate::key::InjectedKey;
use crate::key::Key;

/// Memoizing driver for [`Key`] computations.
///
/// Each top-level [`Evaluator::compute`] call evaluates depth first on the calling
/// thread. A computation that returns `Poll::Pending` has its missing dependencies
/// evaluated and is then run again from scratch. Values are shared between threads;
/// concurrent evaluations of the same key may both run, and the first stored value
/// wins.
///
/// Injecting a value drops every computed value.
pub struct Evaluator {
    injected: RwLock<HashMap<AnyKey, AnyValue>>,
    computed: RwLock<HashMap<AnyKey, AnyValue>>,
    restarts: AtomicUsize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Evaluator {
        Evaluator {
            injected: RwLock::new(HashMap::new()),
            computed: RwLock::new(HashMap::new()),
            restarts: AtomicUsize::new(0),
        }
    }

    pub fn inject<K: InjectedKey>(&self, key: K, value: K::Value) {
        self.injected
            .write()
            .insert(AnyKey::new(key), Arc::new(value));
        self.computed.write().clear();
    }

    pub fn compute<K: Key>(&self, key: &K) -> K::Value {
        match self.eval(key, &mut Vec::new()) {
            Ok(v) => v,
            Err(e) => unreachable!("no computation is running, so `{e}` can't happen"),
        }
    }

    /// Number of times any computation was suspended for missing dependencies.
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Whether a value for the key has been computed and memoized.
    pub fn is_computed<K: Key>(&self, key: &K) -> bool {
        self.computed.read().contains_key(&AnyKey::new(key.clone()))
    }

    fn get_computed<K: Key>(&self, key: &AnyKey) -> Option<K::Value> {
        self.computed
            .read()
            .get(key)
            .and_then(|v| v.downcast_ref::<K::Value>())
            .cloned()
    }

    fn get_injected<K: InjectedKey>(&self, key: &K) -> Result<K::Value, GraphError> {
        self.injected
            .read()
            .get(&AnyKey::new(key.clone()))
            .and_then(|v| v.downcast_ref::<K::Value>())
            .cloned()
            .ok_or_else(|| GraphError::MissingValue {
                key: key.to_string(),
            })
    }

    fn eval<K: Key>(&self, key: &K, stack: &mut Vec<AnyKey>) -> Result<K::Value, GraphError> {
        let any_key = AnyKey::new(key.clone());
        if let Some(v) = self.get_computed::<K>(&any_key) {
            return Ok(v);
        }
        if let Some(pos) = stack.iter().position(|k| k == &any_key) {
            let path = stack[pos..]
                .iter()
                .chain(iter::once(&any_key))
                .map(|k| k.to_string())
                .collect();
            return Err(GraphError::Cycle { path });
        }

        stack.push(any_key.dupe());
        // Graph failures of dependencies, answered to this computation on restart.
        let mut dep_errors = HashMap::new();
        let value = loop {
            let mut env = EvalEnv {
                evaluator: self,
                dep_errors: &dep_errors,
                missing: Vec::new(),
            };
            match key.compute(&mut env) {
                Poll::Ready(v) => break v,
                Poll::Pending => {
                    let missing = env.missing;
                    assert!(
                        !missing.is_empty(),
                        "`{key}` suspended without requesting a missing value"
                    );
                    self.restarts.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, missing = missing.len(), "computation suspended");
                    for dep in missing {
                        if let Err(e) = dep.eval(self, stack) {
                            dep_errors.insert(dep.key().dupe(), e);
                        }
                    }
                }
            }
        };
        stack.pop();

        self.computed
            .write()
            .entry(any_key)
            .or_insert_with(|| Arc::new(value.clone()));
        Ok(value)
    }
}

/// A requested key that had no value yet.
trait MissingDep {
    fn key(&self) -> &AnyKey;
    fn eval(&self, evaluator: &Evaluator, stack: &mut Vec<AnyKey>) -> Result<(), GraphError>;
}

struct Missing<K> {
    key: K,
    any_key: AnyKey,
}

impl<K: Key> MissingDep for Missing<K> {
    fn key(&self) -> &AnyKey {
        &self.any_key
    }

    fn eval(&self, evaluator: &Evaluator, stack: &mut Vec<AnyKey>) -> Result<(), GraphError> {
        evaluator.eval(&self.key, stack).map(|_| ())
    }
}

struct EvalEnv<'a> {
    evaluator: &'a Evaluator,
    dep_errors: &'a HashMap<AnyKey, GraphError>,
    missing: Vec<Box<dyn MissingDep>>,
}

impl DepsEnv for EvalEnv<'_> {
    fn request<K: Key>(&mut self, key: &K) -> Poll<Result<K::Value, GraphError>> {
        let any_key = AnyKey::new(key.clone());
        if let Some(e) = self.dep_errors.get(&any_key) {
            return Poll::Ready(Err(e.clone()));
        }
        match self.evaluator.get_computed::<K>(&any_key) {
            Some(v) => Poll::Ready(Ok(v)),
            None => {
                if !self.missing.iter().any(|m| m.key() == &any_key) {
                    self.missing.push(Box::new(Missing {
                        key: key.clone(),
                        any_key,
                    }));
                }
                Poll::Pending
            }
        }
    }

    fn injected<K: InjectedKey>(&mut self, key: &K) -> Result<K::Value, GraphError> {
        self.evaluator.get_injected(key)
    }
}
