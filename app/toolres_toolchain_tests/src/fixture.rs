/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! A small build graph to resolve toolchains against.
//!
//! Every fixture starts with an `//constraints:os` setting with `linux` and `mac`
//! values, `//platforms:linux` and `//platforms:mac`, and the toolchain type
//! `//toolchain:test_toolchain`. Nothing is registered, and both the target and
//! the host platform are `//platforms:linux`.

use std::sync::Arc;

use dupe::Dupe;
use toolres_core::target::label::TargetLabel;
use toolres_graph::Evaluator;
use toolres_toolchain::configuration::BuildConfiguration;
use toolres_toolchain::configuration::ConfigurationId;
use toolres_toolchain::configuration::ConfigurationKey;
use toolres_toolchain::declaration::TargetDeclaration;
use toolres_toolchain::declaration::TargetDeclarationKey;
use toolres_toolchain::ResolutionRequest;
use toolres_toolchain::ToolchainContext;
use toolres_toolchain::ToolchainContextKey;
use toolres_toolchain::ToolchainResolutionError;

pub(crate) const TEST_TOOLCHAIN_TYPE: &str = "//toolchain:test_toolchain";

pub(crate) fn label(s: &str) -> TargetLabel {
    TargetLabel::testing_parse(s)
}

fn labels(s: &[&str]) -> Vec<TargetLabel> {
    s.iter().copied().map(label).collect()
}

pub(crate) struct Fixture {
    pub(crate) evaluator: Evaluator,
    id: ConfigurationId,
    config: BuildConfiguration,
}

impl Fixture {
    pub(crate) fn new() -> Fixture {
        let fixture = Fixture {
            evaluator: Evaluator::new(),
            id: ConfigurationId::new("test"),
            config: BuildConfiguration::new(label("//platforms:linux"), label("//platforms:linux")),
        };
        fixture.constraint_setting("//constraints:os", None);
        fixture.constraint_value("//constraints:linux", "//constraints:os");
        fixture.constraint_value("//constraints:mac", "//constraints:os");
        fixture.platform("//platforms:linux", &["//constraints:linux"]);
        fixture.platform("//platforms:mac", &["//constraints:mac"]);
        fixture.toolchain_type(TEST_TOOLCHAIN_TYPE);
        fixture.inject_config();
        fixture
    }

    pub(crate) fn configuration_id(&self) -> &ConfigurationId {
        &self.id
    }

    pub(crate) fn declare(&self, target: &str, declaration: TargetDeclaration) {
        self.evaluator
            .inject(TargetDeclarationKey(label(target)), Arc::new(declaration));
    }

    pub(crate) fn constraint_setting(&self, target: &str, default: Option<&str>) {
        self.declare(
            target,
            TargetDeclaration::ConstraintSetting {
                default_constraint_value: default.map(label),
            },
        );
    }

    pub(crate) fn constraint_value(&self, target: &str, setting: &str) {
        self.declare(
            target,
            TargetDeclaration::ConstraintValue {
                constraint_setting: label(setting),
            },
        );
    }

    pub(crate) fn platform(&self, target: &str, constraint_values: &[&str]) {
        self.declare(
            target,
            TargetDeclaration::Platform {
                constraint_values: labels(constraint_values),
                parent: None,
            },
        );
    }

    pub(crate) fn toolchain_type(&self, target: &str) {
        self.declare(target, TargetDeclaration::ToolchainType);
    }

    pub(crate) fn toolchain(
        &self,
        target: &str,
        toolchain_type: &str,
        exec_compatible_with: &[&str],
        target_compatible_with: &[&str],
        toolchain: &str,
    ) {
        self.declare(
            target,
            TargetDeclaration::Toolchain {
                toolchain_type: label(toolchain_type),
                exec_compatible_with: labels(exec_compatible_with),
                target_compatible_with: labels(target_compatible_with),
                toolchain: label(toolchain),
            },
        );
    }

    pub(crate) fn other(&self, target: &str, rule_type: &str) {
        self.declare(
            target,
            TargetDeclaration::Other {
                rule_type: rule_type.to_owned(),
            },
        );
    }

    /// Change the build configuration. Drops everything computed so far.
    pub(crate) fn configure(&mut self, f: impl FnOnce(&mut BuildConfiguration)) {
        f(&mut self.config);
        self.inject_config();
    }

    pub(crate) fn set_configuration(&mut self, config: BuildConfiguration) {
        self.configure(|c| *c = config);
    }

    pub(crate) fn register_execution_platforms(&mut self, platforms: &[&str]) {
        self.configure(|c| c.registered_execution_platforms.extend(labels(platforms)));
    }

    pub(crate) fn register_toolchains(&mut self, toolchains: &[&str]) {
        self.configure(|c| c.registered_toolchains.extend(labels(toolchains)));
    }

    fn inject_config(&self) {
        self.evaluator
            .inject(ConfigurationKey(self.id.dupe()), Arc::new(self.config.clone()));
    }

    pub(crate) fn request(
        &self,
        toolchain_types: &[&str],
        exec_constraints: &[&str],
    ) -> ResolutionRequest {
        ResolutionRequest::new(
            "//test:target",
            labels(toolchain_types),
            labels(exec_constraints),
            self.id.dupe(),
        )
    }

    pub(crate) fn resolve(
        &self,
        toolchain_types: &[&str],
        exec_constraints: &[&str],
    ) -> Result<ToolchainContext, ToolchainResolutionError> {
        self.evaluator.compute(&ToolchainContextKey(
            self.request(toolchain_types, exec_constraints),
        ))
    }
}

/// `(toolchain type, implementation)` pairs of a context, in request order.
pub(crate) fn resolved(context: &ToolchainContext) -> Vec<(&str, &str)> {
    context
        .resolved_toolchains()
        .map(|(t, i)| (t.as_str(), i.as_str()))
        .collect()
}
