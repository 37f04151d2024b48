/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Resolving labels to constraint settings, constraint values and platforms.
//!
//! Each lookup is a graph key, so a platform is built once no matter how many
//! resolutions reference it, and a platform inheriting from itself is reported by
//! the graph as a cycle.

use std::task::ready;
use std::task::Poll;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use toolres_core::configuration::constraints::ConstraintKey;
use toolres_core::configuration::constraints::ConstraintSettingInfo;
use toolres_core::configuration::constraints::ConstraintValue;
use toolres_core::configuration::constraints::ConstraintValueInfo;
use toolres_core::configuration::platform::PlatformError;
use toolres_core::configuration::platform::PlatformInfo;
use toolres_core::target::label::TargetLabel;
use toolres_graph::DepsEnv;
use toolres_graph::GraphError;
use toolres_graph::Key;

use crate::declaration::declaration;
use crate::declaration::TargetDeclaration;
use crate::error::LookupFailure;
use crate::error::ToolchainResolutionError;

/// Unpack a lookup requested while building another lookup. A failed lookup becomes
/// the reason the requester is invalid.
pub(crate) fn dependency<T>(
    res: Result<Result<T, ToolchainResolutionError>, GraphError>,
) -> Result<T, LookupFailure> {
    match res {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => Err(e.into()),
    }
}

/// Unpack a lookup requested by resolution itself. A failed lookup is reported as is.
pub(crate) fn resolved<T>(
    res: Result<Result<T, ToolchainResolutionError>, GraphError>,
    invalid: impl FnOnce(LookupFailure) -> ToolchainResolutionError,
) -> Result<T, ToolchainResolutionError> {
    match res {
        Ok(v) => v,
        Err(e) => Err(invalid(e.into())),
    }
}

#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("{}", _0)]
pub struct ConstraintSettingLookupKey(pub TargetLabel);

impl ConstraintSettingLookupKey {
    pub(crate) fn invalid(&self, reason: LookupFailure) -> ToolchainResolutionError {
        ToolchainResolutionError::InvalidConstraintSetting {
            label: self.0.dupe(),
            reason,
        }
    }

    fn lookup<E: DepsEnv + ?Sized>(
        &self,
        env: &mut E,
    ) -> Result<ConstraintSettingInfo, LookupFailure> {
        let default = match &*declaration(env, &self.0)? {
            TargetDeclaration::ConstraintSetting {
                default_constraint_value,
            } => default_constraint_value.clone(),
            other => return Err(other.wrong_kind()),
        };
        if let Some(default) = &default {
            match declaration(env, default).as_deref() {
                Ok(TargetDeclaration::ConstraintValue { constraint_setting })
                    if constraint_setting == &self.0 => {}
                _ => return Err(LookupFailure::ForeignDefaultValue(default.dupe())),
            }
        }
        Ok(ConstraintSettingInfo::new(
            ConstraintKey(self.0.dupe()),
            default.map(ConstraintValue),
        ))
    }
}

impl Key for ConstraintSettingLookupKey {
    type Value = Result<ConstraintSettingInfo, ToolchainResolutionError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        Poll::Ready(self.lookup(env).map_err(|reason| self.invalid(reason)))
    }
}

#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("{}", _0)]
pub struct ConstraintValueLookupKey(pub TargetLabel);

impl ConstraintValueLookupKey {
    pub(crate) fn invalid(&self, reason: LookupFailure) -> ToolchainResolutionError {
        ToolchainResolutionError::InvalidConstraintValue {
            label: self.0.dupe(),
            reason,
        }
    }

    fn lookup<E: DepsEnv + ?Sized>(
        &self,
        env: &mut E,
    ) -> Poll<Result<ConstraintValueInfo, LookupFailure>> {
        let setting = match &*declaration(env, &self.0)? {
            TargetDeclaration::ConstraintValue { constraint_setting } => constraint_setting.dupe(),
            other => return Poll::Ready(Err(other.wrong_kind())),
        };
        let setting = dependency(ready!(
            env.request(&ConstraintSettingLookupKey(setting))
        ))?;
        Poll::Ready(Ok(ConstraintValueInfo::new(
            ConstraintValue(self.0.dupe()),
            setting,
        )))
    }
}

impl Key for ConstraintValueLookupKey {
    type Value = Result<ConstraintValueInfo, ToolchainResolutionError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        self.lookup(env)
            .map(|res| res.map_err(|reason| self.invalid(reason)))
    }
}

#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("{}", _0)]
pub struct PlatformLookupKey(pub TargetLabel);

impl PlatformLookupKey {
    pub(crate) fn invalid(&self, reason: LookupFailure) -> ToolchainResolutionError {
        ToolchainResolutionError::InvalidPlatform {
            label: self.0.dupe(),
            reason,
        }
    }

    fn lookup<E: DepsEnv + ?Sized>(
        &self,
        env: &mut E,
    ) -> Poll<Result<PlatformInfo, LookupFailure>> {
        let (constraint_values, parent) = match &*declaration(env, &self.0)? {
            TargetDeclaration::Platform {
                constraint_values,
                parent,
            } => (constraint_values.clone(), parent.clone()),
            other => return Poll::Ready(Err(other.wrong_kind())),
        };

        // Issue every request before suspending on any of them.
        let parent = parent.map(|parent| env.request(&PlatformLookupKey(parent)));
        let values = env.request_many(constraint_values.into_iter().map(ConstraintValueLookupKey));
        let parent = match parent {
            Some(parent) => Some(dependency(ready!(parent))?),
            None => None,
        };
        let values = ready!(values)
            .into_iter()
            .map(dependency)
            .collect::<Result<Vec<_>, _>>()?;

        Poll::Ready(
            PlatformInfo::new(self.0.dupe(), parent.as_ref(), &values).map_err(|e| match e {
                PlatformError::DuplicateConstraintValues {
                    setting,
                    first,
                    second,
                    ..
                } => LookupFailure::DuplicateConstraintValues {
                    setting,
                    first,
                    second,
                },
            }),
        )
    }
}

impl Key for PlatformLookupKey {
    type Value = Result<PlatformInfo, ToolchainResolutionError>;

    fn compute<E: DepsEnv + ?Sized>(&self, env: &mut E) -> Poll<Self::Value> {
        self.lookup(env)
            .map(|res| res.map_err(|reason| self.invalid(reason)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use toolres_graph::Evaluator;

    use super::*;
    use crate::declaration::TargetDeclarationKey;

    fn label(s: &str) -> TargetLabel {
        TargetLabel::testing_parse(s)
    }

    fn declare(evaluator: &Evaluator, target: &str, declaration: TargetDeclaration) {
        evaluator.inject(TargetDeclarationKey(label(target)), Arc::new(declaration));
    }

    fn declare_os(evaluator: &Evaluator, default: Option<&str>) {
        declare(
            evaluator,
            "//constraints:os",
            TargetDeclaration::ConstraintSetting {
                default_constraint_value: default.map(label),
            },
        );
        for value in ["//constraints:linux", "//constraints:mac"] {
            declare(
                evaluator,
                value,
                TargetDeclaration::ConstraintValue {
                    constraint_setting: label("//constraints:os"),
                },
            );
        }
    }

    fn declare_platform(
        evaluator: &Evaluator,
        target: &str,
        values: &[&str],
        parent: Option<&str>,
    ) {
        declare(
            evaluator,
            target,
            TargetDeclaration::Platform {
                constraint_values: values.iter().copied().map(label).collect(),
                parent: parent.map(label),
            },
        );
    }

    #[test]
    fn test_constraint_value_carries_setting_default() {
        let evaluator = Evaluator::new();
        declare_os(&evaluator, Some("//constraints:linux"));

        let mac = evaluator
            .compute(&ConstraintValueLookupKey(label("//constraints:mac")))
            .unwrap();
        assert_eq!(&label("//constraints:mac"), mac.label());
        assert_eq!(
            Some(&ConstraintValue::testing_new("//constraints:linux")),
            mac.setting().default_value()
        );
    }

    #[test]
    fn test_foreign_default_is_invalid_setting() {
        let evaluator = Evaluator::new();
        declare_os(&evaluator, Some("//constraints:x86_64"));
        declare(
            &evaluator,
            "//constraints:x86_64",
            TargetDeclaration::ConstraintValue {
                constraint_setting: label("//constraints:cpu"),
            },
        );

        assert_matches!(
            evaluator.compute(&ConstraintValueLookupKey(label("//constraints:linux"))),
            Err(ToolchainResolutionError::InvalidConstraintValue {
                reason: LookupFailure::Dependency(inner),
                ..
            }) => {
                assert_matches!(
                    &*inner,
                    ToolchainResolutionError::InvalidConstraintSetting {
                        reason: LookupFailure::ForeignDefaultValue(_),
                        ..
                    }
                );
            }
        );
    }

    #[test]
    fn test_platform_used_as_constraint_value() {
        let evaluator = Evaluator::new();
        declare_os(&evaluator, None);
        declare_platform(&evaluator, "//platforms:linux", &["//constraints:linux"], None);

        let err = evaluator
            .compute(&ConstraintValueLookupKey(label("//platforms:linux")))
            .unwrap_err();
        assert_eq!(
            "Target `//platforms:linux` was referenced as a constraint_value, but it is a `platform` target",
            err.to_string()
        );
    }

    #[test]
    fn test_platform_inherits_parent() {
        let evaluator = Evaluator::new();
        declare_os(&evaluator, None);
        declare(
            &evaluator,
            "//constraints:cpu",
            TargetDeclaration::ConstraintSetting {
                default_constraint_value: None,
            },
        );
        declare(
            &evaluator,
            "//constraints:arm64",
            TargetDeclaration::ConstraintValue {
                constraint_setting: label("//constraints:cpu"),
            },
        );
        declare_platform(&evaluator, "//platforms:linux", &["//constraints:linux"], None);
        declare_platform(
            &evaluator,
            "//platforms:linux_arm64",
            &["//constraints:arm64"],
            Some("//platforms:linux"),
        );

        let platform = evaluator
            .compute(&PlatformLookupKey(label("//platforms:linux_arm64")))
            .unwrap();
        let values: Vec<_> = platform.constraints().map(|v| v.label().as_str()).collect();
        assert_eq!(vec!["//constraints:arm64", "//constraints:linux"], values);
    }

    #[test]
    fn test_platform_with_two_values_for_one_setting() {
        let evaluator = Evaluator::new();
        declare_os(&evaluator, None);
        declare_platform(
            &evaluator,
            "//platforms:both",
            &["//constraints:linux", "//constraints:mac"],
            None,
        );

        assert_matches!(
            evaluator.compute(&PlatformLookupKey(label("//platforms:both"))),
            Err(ToolchainResolutionError::InvalidPlatform {
                label,
                reason: LookupFailure::DuplicateConstraintValues { .. },
            }) if label.as_str() == "//platforms:both"
        );
    }

    #[test]
    fn test_undeclared_platform() {
        let evaluator = Evaluator::new();
        assert_eq!(
            Err(ToolchainResolutionError::InvalidPlatform {
                label: label("//platforms:nope"),
                reason: LookupFailure::NotDeclared,
            }),
            evaluator.compute(&PlatformLookupKey(label("//platforms:nope")))
        );
    }

    #[test]
    fn test_platform_parent_cycle() {
        let evaluator = Evaluator::new();
        declare_platform(&evaluator, "//platforms:a", &[], Some("//platforms:b"));
        declare_platform(&evaluator, "//platforms:b", &[], Some("//platforms:a"));

        assert_matches!(
            evaluator.compute(&PlatformLookupKey(label("//platforms:a"))),
            Err(ToolchainResolutionError::InvalidPlatform { label, .. })
                if label.as_str() == "//platforms:a"
        );

        let evaluator = Evaluator::new();
        declare_platform(&evaluator, "//platforms:a", &[], Some("//platforms:a"));
        assert_matches!(
            evaluator.compute(&PlatformLookupKey(label("//platforms:a"))),
            Err(ToolchainResolutionError::InvalidPlatform {
                reason: LookupFailure::Cycle(path),
                ..
            }) if path == vec!["//platforms:a".to_owned(), "//platforms:a".to_owned()]
        );
    }
}
