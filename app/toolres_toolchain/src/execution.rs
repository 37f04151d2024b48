/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Choosing the execution platform for a target.

use std::collections::HashSet;
use std::sync::Arc;

use dupe::Dupe;
use toolres_core::configuration::compatibility::check_compatible;
use toolres_core::configuration::constraints::ConstraintValueInfo;
use toolres_core::configuration::platform::PlatformInfo;
use toolres_core::target::label::TargetLabel;

use crate::binder::resolve_toolchain;
use crate::error::ExecutionPlatformIncompatibleReason;
use crate::error::ToolchainResolutionError;
use crate::registration::RegisteredToolchains;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionPlatformSelection {
    pub platform: PlatformInfo,
    /// Platforms considered before `platform`, and why each was rejected.
    pub skipped: Vec<(TargetLabel, ExecutionPlatformIncompatibleReason)>,
}

/// Pick the execution platform for a target.
///
/// Without required toolchain types the host platform is used, whether or not it
/// is a registered candidate, as long as it satisfies `exec_constraints`.
///
/// Otherwise candidates are tried in registration order, and the first one that
/// satisfies `exec_constraints` and has a compatible toolchain for every required
/// type is chosen. When none does, types with no compatible toolchain on any
/// candidate are reported as [`ToolchainResolutionError::UnresolvedToolchains`];
/// if every type resolves somewhere, the failure is
/// [`ToolchainResolutionError::NoMatchingPlatform`].
pub fn select_execution_platform(
    candidates: &[PlatformInfo],
    host_platform: &PlatformInfo,
    target_platform: &PlatformInfo,
    toolchain_types: &[TargetLabel],
    exec_constraints: &[ConstraintValueInfo],
    toolchains: &RegisteredToolchains,
) -> Result<ExecutionPlatformSelection, ToolchainResolutionError> {
    let mut skipped = Vec::new();

    if toolchain_types.is_empty() {
        for candidate in std::iter::once(host_platform).chain(candidates) {
            match check_compatible(candidate, exec_constraints) {
                Ok(()) => {
                    return Ok(ExecutionPlatformSelection {
                        platform: candidate.dupe(),
                        skipped,
                    });
                }
                Err(unsatisfied) => skip(
                    &mut skipped,
                    candidate,
                    ExecutionPlatformIncompatibleReason::ConstraintNotSatisfied(unsatisfied),
                ),
            }
        }
        return Err(no_matching_platform(toolchain_types, target_platform, skipped));
    }

    // Types with a compatible toolchain on at least one candidate, regardless of the
    // candidate's exec constraints.
    let mut resolvable: HashSet<&TargetLabel> = HashSet::new();
    for candidate in candidates {
        let mut missing = Vec::new();
        for toolchain_type in toolchain_types {
            if resolve_toolchain(toolchains, toolchain_type, candidate, target_platform).is_some() {
                resolvable.insert(toolchain_type);
            } else {
                missing.push(toolchain_type.dupe());
            }
        }

        if let Err(unsatisfied) = check_compatible(candidate, exec_constraints) {
            skip(
                &mut skipped,
                candidate,
                ExecutionPlatformIncompatibleReason::ConstraintNotSatisfied(unsatisfied),
            );
        } else if !missing.is_empty() {
            skip(
                &mut skipped,
                candidate,
                ExecutionPlatformIncompatibleReason::MissingToolchains(missing),
            );
        } else {
            return Ok(ExecutionPlatformSelection {
                platform: candidate.dupe(),
                skipped,
            });
        }
    }

    let unresolved: Vec<TargetLabel> = toolchain_types
        .iter()
        .filter(|t| !resolvable.contains(t))
        .map(|t| t.dupe())
        .collect();
    if !unresolved.is_empty() {
        return Err(ToolchainResolutionError::UnresolvedToolchains { types: unresolved });
    }
    Err(no_matching_platform(toolchain_types, target_platform, skipped))
}

fn skip(
    skipped: &mut Vec<(TargetLabel, ExecutionPlatformIncompatibleReason)>,
    candidate: &PlatformInfo,
    reason: ExecutionPlatformIncompatibleReason,
) {
    tracing::debug!(platform = %candidate, reason = %reason, "skipping execution platform");
    skipped.push((candidate.label().dupe(), reason));
}

fn no_matching_platform(
    toolchain_types: &[TargetLabel],
    target_platform: &PlatformInfo,
    skipped: Vec<(TargetLabel, ExecutionPlatformIncompatibleReason)>,
) -> ToolchainResolutionError {
    ToolchainResolutionError::NoMatchingPlatform {
        toolchain_types: toolchain_types.to_vec(),
        target_platform: target_platform.label().dupe(),
        skipped: Arc::new(skipped),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use toolres_core::configuration::constraints::ConstraintValue;

    use super::*;
    use crate::registration::RegisteredToolchain;

    struct Fixture {
        linux: ConstraintValueInfo,
        mac: ConstraintValueInfo,
        linux_platform: PlatformInfo,
        mac_platform: PlatformInfo,
    }

    impl Fixture {
        fn new() -> Fixture {
            let linux = ConstraintValueInfo::testing_new("//constraints:linux", "//constraints:os");
            let mac = ConstraintValueInfo::new(
                ConstraintValue::testing_new("//constraints:mac"),
                linux.setting().dupe(),
            );
            Fixture {
                linux_platform: PlatformInfo::testing_new("//platforms:linux", &[linux.dupe()]),
                mac_platform: PlatformInfo::testing_new("//platforms:mac", &[mac.dupe()]),
                linux,
                mac,
            }
        }

        fn toolchain(
            &self,
            rank: usize,
            toolchain_type: &str,
            exec: &ConstraintValueInfo,
            toolchain: &str,
        ) -> RegisteredToolchain {
            RegisteredToolchain {
                rank,
                label: TargetLabel::testing_parse(&format!("//toolchains:registration_{rank}")),
                toolchain_type: TargetLabel::testing_parse(toolchain_type),
                exec_compatible_with: vec![exec.dupe()],
                target_compatible_with: vec![self.linux.dupe()],
                toolchain: TargetLabel::testing_parse(toolchain),
            }
        }

        fn candidates(&self) -> Vec<PlatformInfo> {
            vec![self.mac_platform.dupe(), self.linux_platform.dupe()]
        }
    }

    fn types(labels: &[&str]) -> Vec<TargetLabel> {
        labels.iter().map(|l| TargetLabel::testing_parse(l)).collect()
    }

    #[test]
    fn test_first_candidate_in_order() {
        let f = Fixture::new();
        let toolchains = RegisteredToolchains::new(vec![
            f.toolchain(0, "//types:t", &f.linux, "//impl:linux"),
            f.toolchain(1, "//types:t", &f.mac, "//impl:mac"),
        ]);
        let selection = select_execution_platform(
            &f.candidates(),
            &f.linux_platform,
            &f.linux_platform,
            &types(&["//types:t"]),
            &[],
            &toolchains,
        )
        .unwrap();
        assert_eq!(f.mac_platform, selection.platform);
        assert!(selection.skipped.is_empty());
    }

    #[test]
    fn test_exec_constraint_filters_candidates() {
        let f = Fixture::new();
        let toolchains = RegisteredToolchains::new(vec![
            f.toolchain(0, "//types:t", &f.mac, "//impl:mac"),
            f.toolchain(1, "//types:t", &f.linux, "//impl:linux"),
        ]);
        let selection = select_execution_platform(
            &f.candidates(),
            &f.linux_platform,
            &f.linux_platform,
            &types(&["//types:t"]),
            &[f.linux.dupe()],
            &toolchains,
        )
        .unwrap();
        assert_eq!(f.linux_platform, selection.platform);
        assert_matches!(
            &selection.skipped[..],
            [(label, ExecutionPlatformIncompatibleReason::ConstraintNotSatisfied(_))]
                if label.as_str() == "//platforms:mac"
        );
    }

    #[test]
    fn test_empty_types_prefers_host() {
        let f = Fixture::new();
        let host = PlatformInfo::testing_new("//platforms:host", &[]);
        let selection = select_execution_platform(
            &f.candidates(),
            &host,
            &f.linux_platform,
            &[],
            &[],
            &RegisteredToolchains::default(),
        )
        .unwrap();
        assert_eq!(host, selection.platform);

        // A host without the required constraint gives way to the first candidate
        // that has it.
        let selection = select_execution_platform(
            &f.candidates(),
            &f.mac_platform,
            &f.linux_platform,
            &[],
            &[f.linux.dupe()],
            &RegisteredToolchains::default(),
        )
        .unwrap();
        assert_eq!(f.linux_platform, selection.platform);
        assert_eq!(2, selection.skipped.len());
    }

    #[test]
    fn test_empty_types_nothing_satisfies_constraints() {
        let f = Fixture::new();
        assert_matches!(
            select_execution_platform(
                &[f.mac_platform.dupe()],
                &f.mac_platform,
                &f.linux_platform,
                &[],
                &[f.linux.dupe()],
                &RegisteredToolchains::default(),
            ),
            Err(ToolchainResolutionError::NoMatchingPlatform { toolchain_types, skipped, .. })
                if toolchain_types.is_empty() && skipped.len() == 2
        );
    }

    #[test]
    fn test_types_split_across_platforms() {
        let f = Fixture::new();
        let toolchains = RegisteredToolchains::new(vec![
            f.toolchain(0, "//types:a", &f.mac, "//impl:a"),
            f.toolchain(1, "//types:b", &f.linux, "//impl:b"),
        ]);
        let err = select_execution_platform(
            &f.candidates(),
            &f.linux_platform,
            &f.linux_platform,
            &types(&["//types:a", "//types:b"]),
            &[],
            &toolchains,
        )
        .unwrap_err();
        assert_matches!(
            err,
            ToolchainResolutionError::NoMatchingPlatform { skipped, .. } => {
                assert_eq!(
                    vec![
                        (
                            TargetLabel::testing_parse("//platforms:mac"),
                            ExecutionPlatformIncompatibleReason::MissingToolchains(types(&["//types:b"])),
                        ),
                        (
                            TargetLabel::testing_parse("//platforms:linux"),
                            ExecutionPlatformIncompatibleReason::MissingToolchains(types(&["//types:a"])),
                        ),
                    ],
                    *skipped
                );
            }
        );
    }

    #[test]
    fn test_unresolved_takes_precedence() {
        let f = Fixture::new();
        let toolchains = RegisteredToolchains::new(vec![
            f.toolchain(0, "//types:a", &f.mac, "//impl:a"),
            f.toolchain(1, "//types:b", &f.linux, "//impl:b"),
        ]);
        assert_eq!(
            Err(ToolchainResolutionError::UnresolvedToolchains {
                types: types(&["//types:missing", "//types:also_missing"]),
            }),
            select_execution_platform(
                &f.candidates(),
                &f.linux_platform,
                &f.linux_platform,
                &types(&["//types:missing", "//types:a", "//types:also_missing", "//types:b"]),
                &[],
                &toolchains,
            )
        );
    }

    #[test]
    fn test_no_candidates() {
        let f = Fixture::new();
        assert_eq!(
            Err(ToolchainResolutionError::UnresolvedToolchains {
                types: types(&["//types:a"]),
            }),
            select_execution_platform(
                &[],
                &f.linux_platform,
                &f.linux_platform,
                &types(&["//types:a"]),
                &[],
                &RegisteredToolchains::default(),
            )
        );
    }
}
