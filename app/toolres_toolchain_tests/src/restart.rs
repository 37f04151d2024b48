/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Resolutions suspended on missing dependencies and run again.

use std::any::TypeId;
use std::collections::HashSet;
use std::task::Poll;

use dupe::Dupe;
use toolres_graph::DepsEnv;
use toolres_graph::Evaluator;
use toolres_graph::GraphError;
use toolres_graph::InjectedKey;
use toolres_graph::Key;
use toolres_toolchain::registration::RegisteredExecutionPlatformsKey;
use toolres_toolchain::registration::RegisteredToolchainsKey;
use toolres_toolchain::resolve_toolchains;
use toolres_toolchain::ToolchainContextKey;

use crate::fixture::resolved;
use crate::fixture::Fixture;
use crate::fixture::TEST_TOOLCHAIN_TYPE;

fn fixture() -> Fixture {
    let mut fixture = Fixture::new();
    fixture.toolchain(
        "//toolchain:toolchain_mac",
        TEST_TOOLCHAIN_TYPE,
        &["//constraints:mac"],
        &["//constraints:linux"],
        "//toolchain:impl_mac",
    );
    fixture.toolchain(
        "//toolchain:toolchain_linux",
        TEST_TOOLCHAIN_TYPE,
        &["//constraints:linux"],
        &["//constraints:linux"],
        "//toolchain:impl_linux",
    );
    fixture.register_execution_platforms(&["//platforms:mac", "//platforms:linux"]);
    fixture.register_toolchains(&["//toolchain:toolchain_mac", "//toolchain:toolchain_linux"]);
    fixture
}

/// Answers only requests made in an earlier round; everything else is pending and
/// becomes available in the next round.
struct StagedEnv<'a> {
    evaluator: &'a Evaluator,
    available: HashSet<(TypeId, String)>,
    requested: Vec<(TypeId, String)>,
}

impl DepsEnv for StagedEnv<'_> {
    fn request<K: Key>(&mut self, key: &K) -> Poll<Result<K::Value, GraphError>> {
        let id = (TypeId::of::<K>(), key.to_string());
        if self.available.contains(&id) {
            Poll::Ready(Ok(self.evaluator.compute(key)))
        } else {
            self.requested.push(id);
            Poll::Pending
        }
    }

    fn injected<K: InjectedKey>(&mut self, key: &K) -> Result<K::Value, GraphError> {
        self.evaluator.compute(&Injected(key.clone()))
    }
}

/// Reads an injected value through the evaluator.
#[derive(Clone, Debug, Eq, Hash, PartialEq, allocative::Allocative)]
struct Injected<K>(K);

impl<K: InjectedKey> std::fmt::Display for Injected<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Injected({})", self.0)
    }
}

impl<K: InjectedKey> Key for Injected<K> {
    type Value = Result<K::Value, GraphError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        Poll::Ready(env.injected(&self.0))
    }
}

#[test]
fn test_all_dependencies_requested_before_suspending() -> anyhow::Result<()> {
    let fixture = fixture();
    let request = fixture.request(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"]);
    let mut env = StagedEnv {
        evaluator: &fixture.evaluator,
        available: HashSet::new(),
        requested: Vec::new(),
    };

    assert!(resolve_toolchains(&mut env, &request).is_pending());
    // Target platform, host platform, one constraint, candidates and toolchains.
    assert_eq!(5, env.requested.len());

    env.available.extend(env.requested.drain(..));
    let context = match resolve_toolchains(&mut env, &request) {
        Poll::Ready(res) => res?,
        Poll::Pending => panic!("still pending after every dependency was made available"),
    };
    assert!(env.requested.is_empty());

    let direct = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])?;
    assert_eq!(direct, context);
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_linux")],
        resolved(&context)
    );
    Ok(())
}

#[test]
fn test_cold_and_warm_evaluations_agree() -> anyhow::Result<()> {
    let cold = fixture();
    let cold_context = cold.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    assert!(cold.evaluator.restarts() > 0);

    let warm = fixture();
    warm.evaluator
        .compute(&RegisteredExecutionPlatformsKey(warm.configuration_id().dupe()))?;
    warm.evaluator
        .compute(&RegisteredToolchainsKey(warm.configuration_id().dupe()))?;
    let warm_context = warm.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;

    assert_eq!(cold_context, warm_context);
    assert_eq!(resolved(&cold_context), resolved(&warm_context));
    Ok(())
}

#[test]
fn test_resolution_is_memoized() -> anyhow::Result<()> {
    let fixture = fixture();
    let first = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    let restarts = fixture.evaluator.restarts();
    assert!(
        fixture
            .evaluator
            .is_computed(&ToolchainContextKey(fixture.request(&[TEST_TOOLCHAIN_TYPE], &[])))
    );

    let second = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    assert_eq!(restarts, fixture.evaluator.restarts());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_concurrent_resolutions() -> anyhow::Result<()> {
    let fixture = fixture();
    let expected = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])?;

    let fresh = self::fixture();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let fresh = &fresh;
                s.spawn(move || {
                    let constraints: &[&str] = if i % 2 == 0 {
                        &["//constraints:linux"]
                    } else {
                        &["//constraints:linux", "//constraints:linux"]
                    };
                    fresh.resolve(&[TEST_TOOLCHAIN_TYPE], constraints)
                })
            })
            .collect();
        for h in handles {
            let context = h.join().unwrap().unwrap();
            assert_eq!(resolved(&expected), resolved(&context));
            assert_eq!(expected.execution_platform(), context.execution_platform());
        }
    });
    Ok(())
}
