/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use serde::Deserialize;
use serde::Serialize;
use toolres_core::target::label::TargetLabel;
use toolres_graph::DepsEnv;
use toolres_graph::InjectedKey;

use crate::error::ToolchainResolutionError;

/// Names one build configuration. Resolution requests carry it so that equal
/// requests under different configurations are different computations.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
pub struct ConfigurationId(Arc<str>);

impl ConfigurationId {
    pub fn new(id: &str) -> ConfigurationId {
        ConfigurationId(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The platform and toolchain registrations in effect for one configuration.
///
/// Registration order is kept exactly as declared: `extra_*` entries come first,
/// then `registered_*` ones, and duplicates are not removed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfiguration {
    pub target_platform: TargetLabel,
    pub host_platform: TargetLabel,
    #[serde(default)]
    pub extra_execution_platforms: Vec<TargetLabel>,
    #[serde(default)]
    pub registered_execution_platforms: Vec<TargetLabel>,
    #[serde(default)]
    pub extra_toolchains: Vec<TargetLabel>,
    #[serde(default)]
    pub registered_toolchains: Vec<TargetLabel>,
}

impl BuildConfiguration {
    pub fn new(target_platform: TargetLabel, host_platform: TargetLabel) -> BuildConfiguration {
        BuildConfiguration {
            target_platform,
            host_platform,
            extra_execution_platforms: Vec::new(),
            registered_execution_platforms: Vec::new(),
            extra_toolchains: Vec::new(),
            registered_toolchains: Vec::new(),
        }
    }

    /// Candidate execution platforms in registration order.
    pub fn execution_platforms(&self) -> impl Iterator<Item = &TargetLabel> {
        self.extra_execution_platforms
            .iter()
            .chain(&self.registered_execution_platforms)
    }

    /// Toolchains in registration order. The position is the registration rank.
    pub fn toolchains(&self) -> impl Iterator<Item = &TargetLabel> {
        self.extra_toolchains
            .iter()
            .chain(&self.registered_toolchains)
    }
}

#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("Configuration({})", _0)]
pub struct ConfigurationKey(pub ConfigurationId);

impl InjectedKey for ConfigurationKey {
    type Value = Arc<BuildConfiguration>;
}

pub(crate) fn build_configuration<E: DepsEnv + ?Sized>(
    env: &mut E,
    id: &ConfigurationId,
) -> Result<Arc<BuildConfiguration>, ToolchainResolutionError> {
    env.injected(&ConfigurationKey(id.dupe())).map_err(|source| {
        ToolchainResolutionError::UnknownConfiguration {
            configuration: id.dupe(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_configuration() {
        let config: BuildConfiguration = serde_json::from_str(
            r#"{
                "target_platform": "//platforms:linux",
                "host_platform": "//platforms:host",
                "extra_execution_platforms": ["//platforms:remote"],
                "registered_execution_platforms": ["//platforms:mac", "//platforms:remote"],
                "registered_toolchains": ["//toolchains:gcc"]
            }"#,
        )
        .unwrap();

        assert_eq!("//platforms:linux", config.target_platform.as_str());
        assert_eq!(
            vec!["//platforms:remote", "//platforms:mac", "//platforms:remote"],
            config
                .execution_platforms()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!(
            vec!["//toolchains:gcc"],
            config.toolchains().map(|l| l.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_parse_configuration_rejects_bad_input() {
        assert!(
            serde_json::from_str::<BuildConfiguration>(
                r#"{"target_platform": "platforms:linux", "host_platform": "//platforms:host"}"#
            )
            .is_err()
        );
        assert!(
            serde_json::from_str::<BuildConfiguration>(
                r#"{"target_platform": "//p:a", "host_platform": "//p:a", "platforms": []}"#
            )
            .is_err()
        );
    }

    #[test]
    fn test_round_trip() {
        let mut config = BuildConfiguration::new(
            TargetLabel::testing_parse("//platforms:linux"),
            TargetLabel::testing_parse("//platforms:linux"),
        );
        config
            .extra_toolchains
            .push(TargetLabel::testing_parse("//toolchains:extra"));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(config, serde_json::from_str(&json).unwrap());
    }
}
