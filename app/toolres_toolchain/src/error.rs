/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::fmt::Write;
use std::sync::Arc;

use indent_write::indentable::Indentable;
use itertools::Itertools;
use toolres_core::configuration::compatibility::UnsatisfiedConstraint;
use toolres_core::configuration::constraints::ConstraintKey;
use toolres_core::configuration::constraints::ConstraintValue;
use toolres_core::target::label::TargetLabel;
use toolres_graph::GraphError;

use crate::configuration::ConfigurationId;

/// Why a label can't be used as the kind of target it was referenced as.
#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum LookupFailure {
    #[error("no such target is declared")]
    NotDeclared,
    #[error("it is a `{0}` target")]
    WrongKind(String),
    #[error("it depends on itself: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("it sets `{setting}` to both `{first}` and `{second}`")]
    DuplicateConstraintValues {
        setting: ConstraintKey,
        first: ConstraintValue,
        second: ConstraintValue,
    },
    #[error("its default value `{0}` is not a constraint_value of this setting")]
    ForeignDefaultValue(TargetLabel),
    #[error("its toolchain_type `{0}` is not a toolchain_type target")]
    NotAToolchainType(TargetLabel),
    #[error("{0}")]
    Dependency(Arc<ToolchainResolutionError>),
}

impl From<GraphError> for LookupFailure {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Cycle { path } => LookupFailure::Cycle(path),
            GraphError::MissingValue { .. } => LookupFailure::NotDeclared,
        }
    }
}

impl From<ToolchainResolutionError> for LookupFailure {
    fn from(e: ToolchainResolutionError) -> Self {
        LookupFailure::Dependency(Arc::new(e))
    }
}

/// Why a candidate execution platform was not selected.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ExecutionPlatformIncompatibleReason {
    ConstraintNotSatisfied(UnsatisfiedConstraint),
    MissingToolchains(Vec<TargetLabel>),
}

impl fmt::Display for ExecutionPlatformIncompatibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPlatformIncompatibleReason::ConstraintNotSatisfied(v) => {
                write!(f, "exec_compatible_with not satisfied: {v}")
            }
            ExecutionPlatformIncompatibleReason::MissingToolchains(types) => write!(
                f,
                "no compatible toolchains for types {}",
                types.iter().join(", ")
            ),
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum ToolchainResolutionError {
    #[error("Target `{label}` was referenced as a platform, but {reason}")]
    InvalidPlatform {
        label: TargetLabel,
        reason: LookupFailure,
    },
    #[error("Target `{label}` was referenced as a constraint_value, but {reason}")]
    InvalidConstraintValue {
        label: TargetLabel,
        reason: LookupFailure,
    },
    #[error("Target `{label}` was referenced as a constraint_setting, but {reason}")]
    InvalidConstraintSetting {
        label: TargetLabel,
        reason: LookupFailure,
    },
    #[error("Target `{label}` was registered as a toolchain, but {reason}")]
    InvalidToolchainLabel {
        label: TargetLabel,
        reason: LookupFailure,
    },
    /// Some required types have no compatible toolchain on any candidate platform.
    #[error("no matching toolchains found for types {}", .types.iter().join(", "))]
    UnresolvedToolchains { types: Vec<TargetLabel> },
    /// Every type resolves somewhere, but never all of them on one platform.
    #[error("{}", format_no_matching_platform(.toolchain_types, .target_platform, .skipped))]
    NoMatchingPlatform {
        toolchain_types: Vec<TargetLabel>,
        target_platform: TargetLabel,
        skipped: Arc<Vec<(TargetLabel, ExecutionPlatformIncompatibleReason)>>,
    },
    #[error("Configuration `{configuration}` is not available")]
    UnknownConfiguration {
        configuration: ConfigurationId,
        source: GraphError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

fn format_no_matching_platform(
    toolchain_types: &[TargetLabel],
    target_platform: &TargetLabel,
    skipped: &[(TargetLabel, ExecutionPlatformIncompatibleReason)],
) -> String {
    let mut message = format!(
        "Unable to find an execution platform for toolchains [{}] and target platform `{}`",
        toolchain_types.iter().join(", "),
        target_platform
    );
    if skipped.is_empty() {
        message.push_str(": no execution platforms are registered");
        return message;
    }
    message.push('.');
    for (platform, reason) in skipped {
        // Writing to a String never fails.
        let _ = write!(
            message,
            "\n  `{}` skipped because:\n{}",
            platform,
            reason.indented("    ")
        );
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_platform_message() {
        let err = ToolchainResolutionError::NoMatchingPlatform {
            toolchain_types: vec![
                TargetLabel::testing_parse("//a:toolchain_type_A"),
                TargetLabel::testing_parse("//b:toolchain_type_B"),
            ],
            target_platform: TargetLabel::testing_parse("//platforms:linux"),
            skipped: Arc::new(vec![
                (
                    TargetLabel::testing_parse("//platforms:mac"),
                    ExecutionPlatformIncompatibleReason::MissingToolchains(vec![
                        TargetLabel::testing_parse("//b:toolchain_type_B"),
                    ]),
                ),
                (
                    TargetLabel::testing_parse("//platforms:linux"),
                    ExecutionPlatformIncompatibleReason::ConstraintNotSatisfied(
                        UnsatisfiedConstraint {
                            required: ConstraintValue::testing_new("//constraints:mac"),
                            setting: ConstraintKey::testing_new("//constraints:os"),
                            actual: Some(ConstraintValue::testing_new("//constraints:linux")),
                        },
                    ),
                ),
            ]),
        };
        assert_eq!(
            "Unable to find an execution platform for toolchains \
             [//a:toolchain_type_A, //b:toolchain_type_B] and target platform `//platforms:linux`.\n\
             \x20 `//platforms:mac` skipped because:\n\
             \x20   no compatible toolchains for types //b:toolchain_type_B\n\
             \x20 `//platforms:linux` skipped because:\n\
             \x20   exec_compatible_with not satisfied: `//constraints:mac` is required but \
             `//constraints:os` is set to `//constraints:linux`",
            err.to_string()
        );
    }

    #[test]
    fn test_nested_lookup_failure_message() {
        let err = ToolchainResolutionError::InvalidPlatform {
            label: TargetLabel::testing_parse("//platforms:child"),
            reason: LookupFailure::from(ToolchainResolutionError::InvalidPlatform {
                label: TargetLabel::testing_parse("//invalid:not_a_platform"),
                reason: LookupFailure::WrongKind("filegroup".to_owned()),
            }),
        };
        assert_eq!(
            "Target `//platforms:child` was referenced as a platform, but Target \
             `//invalid:not_a_platform` was referenced as a platform, but it is a `filegroup` target",
            err.to_string()
        );
    }
}
