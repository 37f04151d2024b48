/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use toolres_core::configuration::compatibility::compatible;
use toolres_core::configuration::platform::PlatformInfo;
use toolres_core::target::label::TargetLabel;

use crate::registration::RegisteredToolchain;
use crate::registration::RegisteredToolchains;

/// The first registration of `toolchain_type`, in registration order, usable when
/// running on `exec_platform` and building for `target_platform`.
pub fn resolve_toolchain<'a>(
    toolchains: &'a RegisteredToolchains,
    toolchain_type: &TargetLabel,
    exec_platform: &PlatformInfo,
    target_platform: &PlatformInfo,
) -> Option<&'a RegisteredToolchain> {
    let found = toolchains.for_type(toolchain_type).find(|t| {
        compatible(exec_platform, &t.exec_compatible_with)
            && compatible(target_platform, &t.target_compatible_with)
    });
    match found {
        Some(t) => tracing::trace!(
            toolchain_type = %toolchain_type,
            exec_platform = %exec_platform,
            toolchain = %t.toolchain,
            "toolchain bound"
        ),
        None => tracing::trace!(
            toolchain_type = %toolchain_type,
            exec_platform = %exec_platform,
            "no compatible toolchain"
        ),
    }
    found
}

#[cfg(test)]
mod tests {
    use dupe::Dupe;
    use toolres_core::configuration::constraints::ConstraintValue;
    use toolres_core::configuration::constraints::ConstraintValueInfo;

    use super::*;

    struct Os {
        linux: ConstraintValueInfo,
        mac: ConstraintValueInfo,
    }

    fn os() -> Os {
        let linux = ConstraintValueInfo::testing_new("//constraints:linux", "//constraints:os");
        let mac = ConstraintValueInfo::new(
            ConstraintValue::testing_new("//constraints:mac"),
            linux.setting().dupe(),
        );
        Os { linux, mac }
    }

    fn registration(
        rank: usize,
        exec: &[&ConstraintValueInfo],
        target: &[&ConstraintValueInfo],
        toolchain: &str,
    ) -> RegisteredToolchain {
        RegisteredToolchain {
            rank,
            label: TargetLabel::testing_parse(&format!("//toolchains:registration_{rank}")),
            toolchain_type: TargetLabel::testing_parse("//types:cxx"),
            exec_compatible_with: exec.iter().map(|v| (*v).dupe()).collect(),
            target_compatible_with: target.iter().map(|v| (*v).dupe()).collect(),
            toolchain: TargetLabel::testing_parse(toolchain),
        }
    }

    #[test]
    fn test_first_compatible_registration_wins() {
        let os = os();
        let toolchains = RegisteredToolchains::new(vec![
            registration(0, &[&os.mac], &[&os.linux], "//impl:mac_to_linux"),
            registration(1, &[&os.linux], &[&os.linux], "//impl:linux_to_linux"),
            registration(2, &[], &[], "//impl:anywhere"),
        ]);
        let linux = PlatformInfo::testing_new("//platforms:linux", &[os.linux.dupe()]);
        let mac = PlatformInfo::testing_new("//platforms:mac", &[os.mac.dupe()]);
        let cxx = TargetLabel::testing_parse("//types:cxx");

        let bound = |exec: &PlatformInfo, target: &PlatformInfo| {
            resolve_toolchain(&toolchains, &cxx, exec, target).map(|t| t.toolchain.as_str())
        };
        assert_eq!(Some("//impl:mac_to_linux"), bound(&mac, &linux));
        assert_eq!(Some("//impl:linux_to_linux"), bound(&linux, &linux));
        assert_eq!(Some("//impl:anywhere"), bound(&linux, &mac));
    }

    #[test]
    fn test_no_registration_for_type() {
        let os = os();
        let toolchains = RegisteredToolchains::new(vec![registration(
            0,
            &[&os.linux],
            &[],
            "//impl:linux",
        )]);
        let linux = PlatformInfo::testing_new("//platforms:linux", &[os.linux.dupe()]);
        let mac = PlatformInfo::testing_new("//platforms:mac", &[os.mac.dupe()]);

        assert!(
            resolve_toolchain(
                &toolchains,
                &TargetLabel::testing_parse("//types:java"),
                &linux,
                &linux
            )
            .is_none()
        );
        assert!(
            resolve_toolchain(
                &toolchains,
                &TargetLabel::testing_parse("//types:cxx"),
                &mac,
                &linux
            )
            .is_none()
        );
    }
}
