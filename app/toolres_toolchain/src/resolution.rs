/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;
use std::task::ready;
use std::task::Poll;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use indexmap::IndexMap;
use indexmap::IndexSet;
use toolres_core::target::label::TargetLabel;
use toolres_graph::DepsEnv;
use toolres_graph::Key;

use crate::binder::resolve_toolchain;
use crate::configuration::build_configuration;
use crate::configuration::ConfigurationId;
use crate::context::ToolchainContext;
use crate::error::ToolchainResolutionError;
use crate::execution::select_execution_platform;
use crate::lookup::resolved;
use crate::lookup::ConstraintValueLookupKey;
use crate::lookup::PlatformLookupKey;
use crate::registration::RegisteredExecutionPlatformsKey;
use crate::registration::RegisteredToolchains;
use crate::registration::RegisteredToolchainsKey;

/// What a target needs resolved: its toolchain types and extra execution
/// constraints, under one configuration.
#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("{}", _0.target_description)]
pub struct ResolutionRequest(Arc<ResolutionRequestData>);

#[derive(Debug, Eq, Hash, PartialEq, Allocative)]
struct ResolutionRequestData {
    target_description: String,
    toolchain_types: Vec<TargetLabel>,
    exec_constraints: Vec<TargetLabel>,
    configuration: ConfigurationId,
}

impl ResolutionRequest {
    /// Repeated labels are dropped, keeping the first occurrence.
    pub fn new(
        target_description: impl Into<String>,
        toolchain_types: impl IntoIterator<Item = TargetLabel>,
        exec_constraints: impl IntoIterator<Item = TargetLabel>,
        configuration: ConfigurationId,
    ) -> ResolutionRequest {
        let dedup =
            |labels: IndexSet<TargetLabel>| -> Vec<TargetLabel> { labels.into_iter().collect() };
        ResolutionRequest(Arc::new(ResolutionRequestData {
            target_description: target_description.into(),
            toolchain_types: dedup(toolchain_types.into_iter().collect()),
            exec_constraints: dedup(exec_constraints.into_iter().collect()),
            configuration,
        }))
    }

    pub fn target_description(&self) -> &str {
        &self.0.target_description
    }

    pub fn toolchain_types(&self) -> &[TargetLabel] {
        &self.0.toolchain_types
    }

    pub fn exec_constraints(&self) -> &[TargetLabel] {
        &self.0.exec_constraints
    }

    pub fn configuration(&self) -> &ConfigurationId {
        &self.0.configuration
    }
}

/// Resolve the execution platform and toolchains for a request.
///
/// Returns `Poll::Pending` when some dependency is not computed yet; the caller
/// re-runs it from the start once it is. Failures are reported in this order:
/// target platform, host platform, extra exec constraints, candidate platforms,
/// registered toolchains, then selection.
pub fn resolve_toolchains<E: DepsEnv + ?Sized>(
    env: &mut E,
    request: &ResolutionRequest,
) -> Poll<Result<ToolchainContext, ToolchainResolutionError>> {
    let span = tracing::debug_span!("resolve_toolchains", request = %request);
    let _enter = span.enter();

    let config = build_configuration(env, request.configuration())?;

    // Issue every request before suspending on any of them.
    let target_key = PlatformLookupKey(config.target_platform.dupe());
    let host_key = PlatformLookupKey(config.host_platform.dupe());
    let target_platform = env.request(&target_key);
    let host_platform = env.request(&host_key);
    let constraint_keys: Vec<ConstraintValueLookupKey> = request
        .exec_constraints()
        .iter()
        .map(|label| ConstraintValueLookupKey(label.dupe()))
        .collect();
    let exec_constraints = env.request_many(constraint_keys.iter().cloned());
    let candidates = env.request(&RegisteredExecutionPlatformsKey(
        request.configuration().dupe(),
    ));
    let toolchains = if request.toolchain_types().is_empty() {
        None
    } else {
        Some(env.request(&RegisteredToolchainsKey(request.configuration().dupe())))
    };

    let target_platform = ready!(target_platform);
    let host_platform = ready!(host_platform);
    let exec_constraints = ready!(exec_constraints);
    let candidates = ready!(candidates);
    let toolchains = match toolchains {
        Some(toolchains) => Some(ready!(toolchains)),
        None => None,
    };

    let target_platform = resolved(target_platform, |reason| target_key.invalid(reason))?;
    let host_platform = resolved(host_platform, |reason| host_key.invalid(reason))?;
    let exec_constraints = exec_constraints
        .into_iter()
        .zip(&constraint_keys)
        .map(|(res, key)| resolved(res, |reason| key.invalid(reason)))
        .collect::<Result<Vec<_>, _>>()?;
    let candidates = candidates??;
    let toolchains = match toolchains {
        Some(toolchains) => toolchains??,
        None => Arc::new(RegisteredToolchains::default()),
    };

    let selection = select_execution_platform(
        candidates.candidates(),
        &host_platform,
        &target_platform,
        request.toolchain_types(),
        &exec_constraints,
        &toolchains,
    )?;

    // Selection only showed that every type resolves on the chosen platform; bind
    // the actual implementations now that the platform is fixed.
    let mut resolved_toolchains = IndexMap::with_capacity(request.toolchain_types().len());
    for toolchain_type in request.toolchain_types() {
        let toolchain = resolve_toolchain(
            &toolchains,
            toolchain_type,
            &selection.platform,
            &target_platform,
        )
        .ok_or_else(|| ToolchainResolutionError::UnresolvedToolchains {
            types: vec![toolchain_type.dupe()],
        })?;
        resolved_toolchains.insert(toolchain_type.dupe(), toolchain.toolchain.dupe());
    }

    tracing::debug!(
        execution_platform = %selection.platform,
        toolchains = resolved_toolchains.len(),
        "resolved toolchains"
    );

    Poll::Ready(Ok(ToolchainContext::new(
        request.target_description().to_owned(),
        request.toolchain_types().to_vec(),
        selection.platform,
        target_platform,
        resolved_toolchains,
        selection.skipped,
    )))
}

/// Toolchain resolution as a graph computation, shared by everything that asks
/// about the same target under the same configuration.
#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("ToolchainContext({})", _0)]
pub struct ToolchainContextKey(pub ResolutionRequest);

impl Key for ToolchainContextKey {
    type Value = Result<ToolchainContext, ToolchainResolutionError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        resolve_toolchains(env, &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_drops_repeated_labels() {
        let request = ResolutionRequest::new(
            "//app:bin",
            [
                TargetLabel::testing_parse("//types:b"),
                TargetLabel::testing_parse("//types:a"),
                TargetLabel::testing_parse("//types:b"),
            ],
            [
                TargetLabel::testing_parse("//constraints:linux"),
                TargetLabel::testing_parse("//constraints:linux"),
            ],
            ConfigurationId::new("default"),
        );
        assert_eq!(
            vec!["//types:b", "//types:a"],
            request
                .toolchain_types()
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!(1, request.exec_constraints().len());
        assert_eq!("//app:bin", request.to_string());
    }
}
