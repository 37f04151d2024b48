/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Per-configuration snapshots of registered execution platforms and toolchains.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::ready;
use std::task::Poll;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use indexmap::IndexSet;
use toolres_core::configuration::constraints::ConstraintValueInfo;
use toolres_core::configuration::platform::PlatformInfo;
use toolres_core::target::label::TargetLabel;
use toolres_graph::DepsEnv;
use toolres_graph::Key;

use crate::configuration::build_configuration;
use crate::configuration::ConfigurationId;
use crate::declaration::declaration;
use crate::declaration::TargetDeclaration;
use crate::error::LookupFailure;
use crate::error::ToolchainResolutionError;
use crate::lookup::resolved;
use crate::lookup::ConstraintValueLookupKey;
use crate::lookup::PlatformLookupKey;

/// Candidate execution platforms, in registration order.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct RegisteredExecutionPlatforms {
    platforms: Vec<PlatformInfo>,
}

impl RegisteredExecutionPlatforms {
    pub fn new(platforms: Vec<PlatformInfo>) -> RegisteredExecutionPlatforms {
        RegisteredExecutionPlatforms { platforms }
    }

    pub fn candidates(&self) -> &[PlatformInfo] {
        &self.platforms
    }
}

#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("RegisteredExecutionPlatforms({})", _0)]
pub struct RegisteredExecutionPlatformsKey(pub ConfigurationId);

impl Key for RegisteredExecutionPlatformsKey {
    type Value = Result<Arc<RegisteredExecutionPlatforms>, ToolchainResolutionError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        let config = build_configuration(env, &self.0)?;
        let keys: Vec<PlatformLookupKey> = config
            .execution_platforms()
            .map(|label| PlatformLookupKey(label.dupe()))
            .collect();
        let platforms = ready!(env.request_many(keys.iter().cloned()))
            .into_iter()
            .zip(&keys)
            .map(|(res, key)| resolved(res, |reason| key.invalid(reason)))
            .collect::<Result<Vec<_>, _>>()?;
        Poll::Ready(Ok(Arc::new(RegisteredExecutionPlatforms::new(platforms))))
    }
}

/// A `toolchain()` registration binding an implementation to a toolchain type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisteredToolchain {
    /// Position in the configuration's registration order.
    pub rank: usize,
    /// The `toolchain()` target itself.
    pub label: TargetLabel,
    pub toolchain_type: TargetLabel,
    pub exec_compatible_with: Vec<ConstraintValueInfo>,
    pub target_compatible_with: Vec<ConstraintValueInfo>,
    /// The implementation the registration points at.
    pub toolchain: TargetLabel,
}

/// Registered toolchains of one configuration, indexed by toolchain type.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct RegisteredToolchains {
    toolchains: Vec<RegisteredToolchain>,
    by_type: HashMap<TargetLabel, Vec<usize>>,
}

impl RegisteredToolchains {
    /// `toolchains` must be in registration order.
    pub fn new(toolchains: Vec<RegisteredToolchain>) -> RegisteredToolchains {
        let mut by_type: HashMap<TargetLabel, Vec<usize>> = HashMap::new();
        for (i, toolchain) in toolchains.iter().enumerate() {
            by_type
                .entry(toolchain.toolchain_type.dupe())
                .or_default()
                .push(i);
        }
        RegisteredToolchains { toolchains, by_type }
    }

    /// Registrations of a type, in registration order.
    pub fn for_type<'a>(
        &'a self,
        toolchain_type: &TargetLabel,
    ) -> impl Iterator<Item = &'a RegisteredToolchain> + 'a {
        self.by_type
            .get(toolchain_type)
            .map_or(&[][..], |v| v.as_slice())
            .iter()
            .map(|&i| &self.toolchains[i])
    }

    pub fn all(&self) -> &[RegisteredToolchain] {
        &self.toolchains
    }
}

struct ToolchainDeclaration {
    label: TargetLabel,
    toolchain_type: TargetLabel,
    exec_compatible_with: Vec<TargetLabel>,
    target_compatible_with: Vec<TargetLabel>,
    toolchain: TargetLabel,
}

fn toolchain_declaration<E: DepsEnv + ?Sized>(
    env: &mut E,
    label: &TargetLabel,
) -> Result<ToolchainDeclaration, ToolchainResolutionError> {
    let invalid = |reason| ToolchainResolutionError::InvalidToolchainLabel {
        label: label.dupe(),
        reason,
    };
    let (toolchain_type, exec_compatible_with, target_compatible_with, toolchain) =
        match declaration(env, label).map_err(invalid)?.as_ref() {
            TargetDeclaration::Toolchain {
                toolchain_type,
                exec_compatible_with,
                target_compatible_with,
                toolchain,
            } => (
                toolchain_type.dupe(),
                exec_compatible_with.clone(),
                target_compatible_with.clone(),
                toolchain.dupe(),
            ),
            other => return Err(invalid(other.wrong_kind())),
        };
    match declaration(env, &toolchain_type).as_deref() {
        Ok(TargetDeclaration::ToolchainType) => {}
        _ => return Err(invalid(LookupFailure::NotAToolchainType(toolchain_type))),
    }
    Ok(ToolchainDeclaration {
        label: label.dupe(),
        toolchain_type,
        exec_compatible_with,
        target_compatible_with,
        toolchain,
    })
}

#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("RegisteredToolchains({})", _0)]
pub struct RegisteredToolchainsKey(pub ConfigurationId);

impl Key for RegisteredToolchainsKey {
    type Value = Result<Arc<RegisteredToolchains>, ToolchainResolutionError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        let config = build_configuration(env, &self.0)?;
        let declarations = config
            .toolchains()
            .map(|label| toolchain_declaration(env, label))
            .collect::<Result<Vec<_>, _>>()?;

        // Every constraint value referenced by any registration, requested in one batch.
        let constraint_labels: IndexSet<&TargetLabel> = declarations
            .iter()
            .flat_map(|d| d.exec_compatible_with.iter().chain(&d.target_compatible_with))
            .collect();
        let keys: Vec<ConstraintValueLookupKey> = constraint_labels
            .into_iter()
            .map(|label| ConstraintValueLookupKey(label.dupe()))
            .collect();
        let values = ready!(env.request_many(keys.iter().cloned()))
            .into_iter()
            .zip(&keys)
            .map(|(res, key)| Ok((key.0.dupe(), resolved(res, |reason| key.invalid(reason))?)))
            .collect::<Result<HashMap<_, _>, ToolchainResolutionError>>()?;

        let lookup = |labels: &[TargetLabel]| -> Vec<ConstraintValueInfo> {
            labels
                .iter()
                .filter_map(|label| values.get(label).map(|v| v.dupe()))
                .collect()
        };
        let toolchains = declarations
            .iter()
            .enumerate()
            .map(|(rank, d)| RegisteredToolchain {
                rank,
                label: d.label.dupe(),
                toolchain_type: d.toolchain_type.dupe(),
                exec_compatible_with: lookup(&d.exec_compatible_with),
                target_compatible_with: lookup(&d.target_compatible_with),
                toolchain: d.toolchain.dupe(),
            })
            .collect();
        Poll::Ready(Ok(Arc::new(RegisteredToolchains::new(toolchains))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(rank: usize, toolchain_type: &str, toolchain: &str) -> RegisteredToolchain {
        RegisteredToolchain {
            rank,
            label: TargetLabel::testing_parse(&format!("//toolchains:registration_{rank}")),
            toolchain_type: TargetLabel::testing_parse(toolchain_type),
            exec_compatible_with: vec![ConstraintValueInfo::testing_new(
                "//constraints:linux",
                "//constraints:os",
            )],
            target_compatible_with: Vec::new(),
            toolchain: TargetLabel::testing_parse(toolchain),
        }
    }

    #[test]
    fn test_for_type_keeps_registration_order() {
        let toolchains = RegisteredToolchains::new(vec![
            registration(0, "//types:cxx", "//impl:clang"),
            registration(1, "//types:java", "//impl:jdk"),
            registration(2, "//types:cxx", "//impl:gcc"),
            registration(3, "//types:cxx", "//impl:clang"),
        ]);

        let cxx: Vec<_> = toolchains
            .for_type(&TargetLabel::testing_parse("//types:cxx"))
            .map(|t| (t.rank, t.toolchain.as_str()))
            .collect();
        assert_eq!(
            vec![(0, "//impl:clang"), (2, "//impl:gcc"), (3, "//impl:clang")],
            cxx
        );
        assert_eq!(
            0,
            toolchains
                .for_type(&TargetLabel::testing_parse("//types:go"))
                .count()
        );
        assert_eq!(4, toolchains.all().len());
    }
}
