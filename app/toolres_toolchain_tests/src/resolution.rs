/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use assert_matches::assert_matches;
use toolres_graph::GraphError;
use toolres_toolchain::configuration::ConfigurationId;
use toolres_toolchain::error::ExecutionPlatformIncompatibleReason;
use toolres_toolchain::error::LookupFailure;
use toolres_toolchain::ResolutionRequest;
use toolres_toolchain::ToolchainContextKey;
use toolres_toolchain::ToolchainResolutionError;

use crate::fixture::label;
use crate::fixture::resolved;
use crate::fixture::Fixture;
use crate::fixture::TEST_TOOLCHAIN_TYPE;

/// `mac` and `linux` registered in that order, with a `test_toolchain` runnable on
/// each, both building for `linux`.
fn mac_and_linux() -> Fixture {
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

#[test]
fn test_first_compatible_platform_in_registration_order() -> anyhow::Result<()> {
    let fixture = mac_and_linux();
    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;

    assert_eq!(&label("//platforms:mac"), context.execution_platform().label());
    assert_eq!(&label("//platforms:linux"), context.target_platform().label());
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_mac")],
        resolved(&context)
    );
    assert_eq!(&[label(TEST_TOOLCHAIN_TYPE)], context.required_toolchain_types());
    assert_eq!("//test:target", context.target_description());
    assert!(context.skipped_platforms().is_empty());
    Ok(())
}

#[test]
fn test_extra_exec_constraint_selects_later_platform() -> anyhow::Result<()> {
    let fixture = mac_and_linux();
    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])?;

    assert_eq!(&label("//platforms:linux"), context.execution_platform().label());
    assert_eq!(
        Some(&label("//toolchain:impl_linux")),
        context.resolved_toolchain(&label(TEST_TOOLCHAIN_TYPE))
    );
    assert_matches!(
        context.skipped_platforms(),
        [(platform, ExecutionPlatformIncompatibleReason::ConstraintNotSatisfied(_))]
            if platform.as_str() == "//platforms:mac"
    );
    Ok(())
}

#[test]
fn test_no_toolchain_types_uses_host_platform() -> anyhow::Result<()> {
    let mut fixture = mac_and_linux();
    // The host is not a registered candidate, but it is a valid platform.
    fixture.platform("//host:host", &[]);
    fixture.configure(|c| {
        c.host_platform = label("//host:host");
        c.target_platform = label("//platforms:mac");
    });

    let context = fixture.resolve(&[], &[])?;
    assert_eq!(&label("//host:host"), context.execution_platform().label());
    assert_eq!(&label("//platforms:mac"), context.target_platform().label());
    assert_eq!(0, context.resolved_toolchains().len());
    Ok(())
}

#[test]
fn test_no_toolchain_types_with_extra_constraint() -> anyhow::Result<()> {
    let mut fixture = Fixture::new();
    fixture.constraint_setting("//sample:setting", None);
    fixture.constraint_value("//sample:value_a", "//sample:setting");
    fixture.constraint_value("//sample:value_b", "//sample:setting");
    fixture.platform("//sample:sample_a", &["//sample:value_a"]);
    fixture.platform("//sample:sample_b", &["//sample:value_b"]);
    fixture.register_execution_platforms(&["//sample:sample_a", "//sample:sample_b"]);

    // The host platform doesn't set the setting at all, so it is compatible.
    let context = fixture.resolve(&[], &["//sample:value_b"])?;
    assert_eq!(&label("//platforms:linux"), context.execution_platform().label());

    fixture.configure(|c| c.host_platform = label("//sample:sample_a"));
    let context = fixture.resolve(&[], &["//sample:value_b"])?;
    assert_eq!(&label("//sample:sample_b"), context.execution_platform().label());
    Ok(())
}

#[test]
fn test_types_never_resolvable_together() {
    let mut fixture = Fixture::new();
    fixture.toolchain_type("//a:toolchain_type_A");
    fixture.toolchain_type("//b:toolchain_type_B");
    fixture.toolchain(
        "//a:toolchain_A",
        "//a:toolchain_type_A",
        &["//constraints:mac"],
        &[],
        "//a:impl_A",
    );
    fixture.toolchain(
        "//b:toolchain_B",
        "//b:toolchain_type_B",
        &["//constraints:linux"],
        &[],
        "//b:impl_B",
    );
    fixture.register_execution_platforms(&["//platforms:mac", "//platforms:linux"]);
    fixture.register_toolchains(&["//a:toolchain_A", "//b:toolchain_B"]);

    let err = fixture
        .resolve(&["//a:toolchain_type_A", "//b:toolchain_type_B"], &[])
        .unwrap_err();
    assert_matches!(
        &err,
        ToolchainResolutionError::NoMatchingPlatform { skipped, .. } if skipped.len() == 2
    );
    assert_eq!(
        "Unable to find an execution platform for toolchains \
         [//a:toolchain_type_A, //b:toolchain_type_B] and target platform `//platforms:linux`.\n\
         \x20 `//platforms:mac` skipped because:\n\
         \x20   no compatible toolchains for types //b:toolchain_type_B\n\
         \x20 `//platforms:linux` skipped because:\n\
         \x20   no compatible toolchains for types //a:toolchain_type_A",
        err.to_string()
    );
}

#[test]
fn test_unregistered_toolchain_type() {
    let mut fixture = mac_and_linux();
    fixture.register_execution_platforms(&["//platforms:linux"]);

    let err = fixture
        .resolve(&["//fake/toolchain:type_1"], &[])
        .unwrap_err();
    assert_eq!(
        "no matching toolchains found for types //fake/toolchain:type_1",
        err.to_string()
    );
}

#[test]
fn test_unresolved_types_reported_in_request_order() {
    let fixture = mac_and_linux();
    assert_eq!(
        Err(ToolchainResolutionError::UnresolvedToolchains {
            types: vec![
                label("//fake/toolchain:type_2"),
                label("//fake/toolchain:type_1"),
            ],
        }),
        fixture.resolve(
            &[
                "//fake/toolchain:type_2",
                TEST_TOOLCHAIN_TYPE,
                "//fake/toolchain:type_1",
            ],
            &[],
        )
    );
}

#[test]
fn test_invalid_target_platform() {
    let mut fixture = mac_and_linux();
    fixture.other("//invalid:not_a_platform", "filegroup");
    fixture.configure(|c| c.target_platform = label("//invalid:not_a_platform"));

    let err = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[]).unwrap_err();
    assert_eq!(
        ToolchainResolutionError::InvalidPlatform {
            label: label("//invalid:not_a_platform"),
            reason: LookupFailure::WrongKind("filegroup".to_owned()),
        },
        err
    );
    assert!(err.to_string().contains("//invalid:not_a_platform"));
}

#[test]
fn test_invalid_host_platform() {
    let mut fixture = mac_and_linux();
    fixture.configure(|c| c.host_platform = label("//constraints:linux"));

    // Reported even when no toolchain is required.
    assert_matches!(
        fixture.resolve(&[], &[]),
        Err(ToolchainResolutionError::InvalidPlatform { label, reason: LookupFailure::WrongKind(kind) })
            if label.as_str() == "//constraints:linux" && kind == "constraint_value"
    );
}

#[test]
fn test_undeclared_execution_platform() {
    let mut fixture = mac_and_linux();
    fixture.register_execution_platforms(&["//invalid:missing"]);

    let err = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[]).unwrap_err();
    assert_eq!(
        "Target `//invalid:missing` was referenced as a platform, but no such target is declared",
        err.to_string()
    );
}

#[test]
fn test_invalid_exec_constraint() {
    let fixture = mac_and_linux();
    let err = fixture
        .resolve(&[TEST_TOOLCHAIN_TYPE], &["//platforms:linux"])
        .unwrap_err();
    assert_matches!(
        &err,
        ToolchainResolutionError::InvalidConstraintValue { label, .. }
            if label.as_str() == "//platforms:linux"
    );
    assert!(err.to_string().contains("//platforms:linux"));
}

#[test]
fn test_target_platform_checked_before_exec_constraints() {
    let mut fixture = mac_and_linux();
    fixture.configure(|c| c.target_platform = label("//invalid:missing"));
    assert_matches!(
        fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &["//invalid:also_missing"]),
        Err(ToolchainResolutionError::InvalidPlatform { .. })
    );
}

#[test]
fn test_earlier_toolchain_registration_wins() -> anyhow::Result<()> {
    let mut fixture = mac_and_linux();
    fixture.toolchain(
        "//toolchain:toolchain_any",
        TEST_TOOLCHAIN_TYPE,
        &[],
        &[],
        "//toolchain:impl_any",
    );
    fixture.configure(|c| c.extra_toolchains.push(label("//toolchain:toolchain_any")));

    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    assert_eq!(&label("//platforms:mac"), context.execution_platform().label());
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_any")],
        resolved(&context)
    );
    Ok(())
}

#[test]
fn test_extra_execution_platforms_come_first() -> anyhow::Result<()> {
    let mut fixture = mac_and_linux();
    fixture.configure(|c| c.extra_execution_platforms.push(label("//platforms:linux")));

    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    assert_eq!(&label("//platforms:linux"), context.execution_platform().label());
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_linux")],
        resolved(&context)
    );
    Ok(())
}

#[test]
fn test_resolved_toolchains_in_request_order() -> anyhow::Result<()> {
    let mut fixture = mac_and_linux();
    fixture.toolchain_type("//toolchain:other_type");
    fixture.toolchain(
        "//toolchain:other",
        "//toolchain:other_type",
        &[],
        &[],
        "//toolchain:impl_other",
    );
    fixture.register_toolchains(&["//toolchain:other"]);

    let context = fixture.resolve(&["//toolchain:other_type", TEST_TOOLCHAIN_TYPE], &[])?;
    assert_eq!(
        vec![
            ("//toolchain:other_type", "//toolchain:impl_other"),
            (TEST_TOOLCHAIN_TYPE, "//toolchain:impl_mac"),
        ],
        resolved(&context)
    );
    Ok(())
}

#[test]
fn test_resolution_is_deterministic() -> anyhow::Result<()> {
    let first = mac_and_linux().resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])?;
    let second = mac_and_linux().resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])?;
    assert_eq!(first, second);
    assert_eq!(resolved(&first), resolved(&second));
    assert_eq!(first.skipped_platforms(), second.skipped_platforms());
    Ok(())
}

#[test]
fn test_unknown_configuration() {
    let fixture = mac_and_linux();
    let request = ResolutionRequest::new(
        "//test:target",
        [label(TEST_TOOLCHAIN_TYPE)],
        [],
        ConfigurationId::new("missing"),
    );
    assert_matches!(
        fixture.evaluator.compute(&ToolchainContextKey(request)),
        Err(ToolchainResolutionError::UnknownConfiguration {
            configuration,
            source: GraphError::MissingValue { .. },
        }) if configuration.as_str() == "missing"
    );
}

#[test]
fn test_platform_with_unset_setting_is_unconstrained() -> anyhow::Result<()> {
    let mut fixture = mac_and_linux();
    fixture.platform("//platforms:bare", &[]);
    fixture.configure(|c| {
        c.registered_execution_platforms = vec![label("//platforms:bare")];
    });

    // `//platforms:bare` sets no os, so both registrations accept it; the first wins.
    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])?;
    assert_eq!(&label("//platforms:bare"), context.execution_platform().label());
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_mac")],
        resolved(&context)
    );
    Ok(())
}

#[test]
fn test_setting_default_applies() -> anyhow::Result<()> {
    let mut fixture = mac_and_linux();
    fixture.constraint_setting("//constraints:os", Some("//constraints:mac"));
    fixture.platform("//platforms:bare", &[]);
    fixture.configure(|c| {
        c.registered_execution_platforms = vec![label("//platforms:bare")];
    });

    // With a default of mac, the bare platform is a mac.
    let err = fixture
        .resolve(&[TEST_TOOLCHAIN_TYPE], &["//constraints:linux"])
        .unwrap_err();
    assert_matches!(err, ToolchainResolutionError::NoMatchingPlatform { .. });

    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_mac")],
        resolved(&context)
    );
    Ok(())
}
