/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use assert_matches::assert_matches;
use dupe::Dupe;
use toolres_toolchain::configuration::BuildConfiguration;
use toolres_toolchain::error::LookupFailure;
use toolres_toolchain::registration::RegisteredExecutionPlatformsKey;
use toolres_toolchain::registration::RegisteredToolchainsKey;
use toolres_toolchain::ToolchainResolutionError;

use crate::fixture::label;
use crate::fixture::resolved;
use crate::fixture::Fixture;
use crate::fixture::TEST_TOOLCHAIN_TYPE;

fn with_toolchains() -> Fixture {
    let mut fixture = Fixture::new();
    fixture.toolchain(
        "//toolchain:toolchain_1",
        TEST_TOOLCHAIN_TYPE,
        &["//constraints:linux"],
        &["//constraints:mac"],
        "//toolchain:impl_1",
    );
    fixture.toolchain(
        "//toolchain:toolchain_2",
        TEST_TOOLCHAIN_TYPE,
        &["//constraints:mac"],
        &[],
        "//toolchain:impl_2",
    );
    fixture.register_execution_platforms(&["//platforms:linux", "//platforms:mac"]);
    fixture
}

#[test]
fn test_registered_toolchains_keep_order_and_duplicates() -> anyhow::Result<()> {
    let mut fixture = with_toolchains();
    fixture.configure(|c| {
        c.extra_toolchains = vec![label("//toolchain:toolchain_2")];
        c.registered_toolchains = vec![
            label("//toolchain:toolchain_1"),
            label("//toolchain:toolchain_2"),
        ];
    });

    let toolchains = fixture
        .evaluator
        .compute(&RegisteredToolchainsKey(fixture.configuration_id().dupe()))?;
    let order: Vec<_> = toolchains
        .for_type(&label(TEST_TOOLCHAIN_TYPE))
        .map(|t| (t.rank, t.label.as_str()))
        .collect();
    assert_eq!(
        vec![
            (0, "//toolchain:toolchain_2"),
            (1, "//toolchain:toolchain_1"),
            (2, "//toolchain:toolchain_2"),
        ],
        order
    );

    let first = &toolchains.all()[1];
    assert_eq!(
        vec!["//constraints:linux"],
        first
            .exec_compatible_with
            .iter()
            .map(|v| v.label().as_str())
            .collect::<Vec<_>>()
    );
    assert_eq!(
        vec!["//constraints:mac"],
        first
            .target_compatible_with
            .iter()
            .map(|v| v.label().as_str())
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn test_registered_execution_platforms() -> anyhow::Result<()> {
    let fixture = with_toolchains();
    let platforms = fixture
        .evaluator
        .compute(&RegisteredExecutionPlatformsKey(
            fixture.configuration_id().dupe(),
        ))?;
    assert_eq!(
        vec!["//platforms:linux", "//platforms:mac"],
        platforms
            .candidates()
            .iter()
            .map(|p| p.label().as_str())
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn test_registered_label_is_not_a_toolchain() {
    let mut fixture = with_toolchains();
    fixture.register_toolchains(&["//toolchain:toolchain_1", "//platforms:mac"]);

    assert_eq!(
        Err(ToolchainResolutionError::InvalidToolchainLabel {
            label: label("//platforms:mac"),
            reason: LookupFailure::WrongKind("platform".to_owned()),
        }),
        fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])
    );
}

#[test]
fn test_toolchain_type_is_not_a_toolchain_type() {
    let mut fixture = with_toolchains();
    fixture.toolchain(
        "//toolchain:bad_type",
        "//constraints:os",
        &[],
        &[],
        "//toolchain:impl_bad",
    );
    fixture.register_toolchains(&["//toolchain:bad_type"]);

    let err = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[]).unwrap_err();
    assert_eq!(
        "Target `//toolchain:bad_type` was registered as a toolchain, but its toolchain_type \
         `//constraints:os` is not a toolchain_type target",
        err.to_string()
    );
}

#[test]
fn test_toolchain_constraint_is_not_a_constraint_value() {
    let mut fixture = with_toolchains();
    fixture.toolchain(
        "//toolchain:bad_constraint",
        TEST_TOOLCHAIN_TYPE,
        &["//platforms:linux"],
        &[],
        "//toolchain:impl_bad",
    );
    fixture.register_toolchains(&["//toolchain:toolchain_1", "//toolchain:bad_constraint"]);

    assert_matches!(
        fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[]),
        Err(ToolchainResolutionError::InvalidConstraintValue { label, .. })
            if label.as_str() == "//platforms:linux"
    );
}

#[test]
fn test_registrations_not_read_without_toolchain_types() -> anyhow::Result<()> {
    let mut fixture = with_toolchains();
    fixture.register_toolchains(&["//toolchain:undeclared"]);

    let context = fixture.resolve(&[], &[])?;
    assert_eq!(&label("//platforms:linux"), context.execution_platform().label());
    assert!(fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[]).is_err());
    Ok(())
}

#[test]
fn test_configuration_from_json() -> anyhow::Result<()> {
    let mut fixture = with_toolchains();
    let config: BuildConfiguration = serde_json::from_str(
        r#"{
            "target_platform": "//platforms:mac",
            "host_platform": "//platforms:linux",
            "registered_execution_platforms": ["//platforms:linux", "//platforms:mac"],
            "registered_toolchains": ["//toolchain:toolchain_2", "//toolchain:toolchain_1"]
        }"#,
    )?;
    fixture.set_configuration(config);

    let context = fixture.resolve(&[TEST_TOOLCHAIN_TYPE], &[])?;
    // toolchain_2 is registered first but only runs on mac; on linux only
    // toolchain_1 applies, and linux is the first candidate.
    assert_eq!(&label("//platforms:linux"), context.execution_platform().label());
    assert_eq!(
        vec![(TEST_TOOLCHAIN_TYPE, "//toolchain:impl_1")],
        resolved(&context)
    );
    Ok(())
}
