/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use dupe::Dupe;
use indexmap::IndexMap;
use toolres_core::configuration::platform::PlatformInfo;
use toolres_core::target::label::TargetLabel;

use crate::error::ExecutionPlatformIncompatibleReason;

/// The outcome of a successful toolchain resolution.
///
/// Every required toolchain type has exactly one resolved implementation.
#[derive(Clone, Dupe, Debug, Eq, PartialEq)]
pub struct ToolchainContext(Arc<ToolchainContextData>);

#[derive(Debug, Eq, PartialEq)]
struct ToolchainContextData {
    target_description: String,
    required_toolchain_types: Vec<TargetLabel>,
    execution_platform: PlatformInfo,
    target_platform: PlatformInfo,
    resolved_toolchains: IndexMap<TargetLabel, TargetLabel>,
    skipped: Vec<(TargetLabel, ExecutionPlatformIncompatibleReason)>,
}

impl ToolchainContext {
    pub(crate) fn new(
        target_description: String,
        required_toolchain_types: Vec<TargetLabel>,
        execution_platform: PlatformInfo,
        target_platform: PlatformInfo,
        resolved_toolchains: IndexMap<TargetLabel, TargetLabel>,
        skipped: Vec<(TargetLabel, ExecutionPlatformIncompatibleReason)>,
    ) -> ToolchainContext {
        ToolchainContext(Arc::new(ToolchainContextData {
            target_description,
            required_toolchain_types,
            execution_platform,
            target_platform,
            resolved_toolchains,
            skipped,
        }))
    }

    pub fn target_description(&self) -> &str {
        &self.0.target_description
    }

    /// Required toolchain types, in the order they were requested.
    pub fn required_toolchain_types(&self) -> &[TargetLabel] {
        &self.0.required_toolchain_types
    }

    pub fn execution_platform(&self) -> &PlatformInfo {
        &self.0.execution_platform
    }

    pub fn target_platform(&self) -> &PlatformInfo {
        &self.0.target_platform
    }

    pub fn resolved_toolchain(&self, toolchain_type: &TargetLabel) -> Option<&TargetLabel> {
        self.0.resolved_toolchains.get(toolchain_type)
    }

    /// `(toolchain type, implementation)` pairs in request order.
    pub fn resolved_toolchains(
        &self,
    ) -> impl ExactSizeIterator<Item = (&TargetLabel, &TargetLabel)> {
        self.0.resolved_toolchains.iter()
    }

    /// Candidates rejected before the execution platform was found.
    pub fn skipped_platforms(&self) -> &[(TargetLabel, ExecutionPlatformIncompatibleReason)] {
        &self.0.skipped
    }
}
