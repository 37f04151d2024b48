/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;

use crate::configuration::constraints::ConstraintKey;
use crate::configuration::constraints::ConstraintSettingInfo;
use crate::configuration::constraints::ConstraintValue;
use crate::configuration::constraints::ConstraintValueInfo;
use crate::target::label::TargetLabel;

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum PlatformError {
    #[error("Platform `{platform}` sets `{setting}` to both `{first}` and `{second}`")]
    DuplicateConstraintValues {
        platform: TargetLabel,
        setting: ConstraintKey,
        first: ConstraintValue,
        second: ConstraintValue,
    },
}

/// A loaded `platform()`: a named bundle of constraint value assignments.
///
/// Only explicitly set values are stored here. Settings absent from the platform fall
/// back to the setting's default (see [`PlatformInfo::effective_value`]).
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Allocative)]
#[display("{}", _0.label)]
pub struct PlatformInfo(Arc<PlatformInfoData>);

#[derive(Debug, Hash, Eq, PartialEq, Allocative)]
struct PlatformInfoData {
    label: TargetLabel,
    constraints: BTreeMap<ConstraintKey, ConstraintValueInfo>,
}

impl PlatformInfo {
    /// Create a platform from its own constraint values, inheriting every value from
    /// `parent` that it does not set itself.
    pub fn new(
        label: TargetLabel,
        parent: Option<&PlatformInfo>,
        constraint_values: &[ConstraintValueInfo],
    ) -> Result<Self, PlatformError> {
        let mut own: BTreeMap<ConstraintKey, ConstraintValueInfo> = BTreeMap::new();
        for value in constraint_values {
            let key = value.setting().key().dupe();
            if let Some(existing) = own.get(&key) {
                if existing != value {
                    return Err(PlatformError::DuplicateConstraintValues {
                        platform: label,
                        setting: key,
                        first: existing.value().dupe(),
                        second: value.value().dupe(),
                    });
                }
                continue;
            }
            own.insert(key, value.dupe());
        }

        let mut constraints = match parent {
            Some(parent) => parent.0.constraints.clone(),
            None => BTreeMap::new(),
        };
        constraints.extend(own);

        Ok(Self(Arc::new(PlatformInfoData { label, constraints })))
    }

    pub fn label(&self) -> &TargetLabel {
        &self.0.label
    }

    /// The value explicitly set for the setting, if any.
    pub fn get(&self, key: &ConstraintKey) -> Option<&ConstraintValueInfo> {
        self.0.constraints.get(key)
    }

    /// The explicit value for the setting, or the setting's default. `None` means
    /// the platform is unconstrained on this setting.
    pub fn effective_value<'a>(
        &'a self,
        setting: &'a ConstraintSettingInfo,
    ) -> Option<&'a ConstraintValue> {
        match self.get(setting.key()) {
            Some(v) => Some(v.value()),
            None => setting.default_value(),
        }
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintValueInfo> {
        self.0.constraints.values()
    }

    pub fn testing_new(label: &str, constraint_values: &[ConstraintValueInfo]) -> PlatformInfo {
        PlatformInfo::new(TargetLabel::testing_parse(label), None, constraint_values).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_effective_value_uses_default() {
        let os = ConstraintSettingInfo::new(
            ConstraintKey::testing_new("//constraints:os"),
            Some(ConstraintValue::testing_new("//constraints:linux")),
        );
        let mac = ConstraintValueInfo::new(ConstraintValue::testing_new("//constraints:mac"), os.dupe());

        let empty = PlatformInfo::testing_new("//platforms:empty", &[]);
        assert_eq!(
            Some(&ConstraintValue::testing_new("//constraints:linux")),
            empty.effective_value(&os)
        );

        let mac_platform = PlatformInfo::testing_new("//platforms:mac", &[mac.dupe()]);
        assert_eq!(Some(mac.value()), mac_platform.effective_value(&os));
    }

    #[test]
    fn test_parent_values_are_inherited_and_overridden() {
        let linux = ConstraintValueInfo::testing_new("//constraints:linux", "//constraints:os");
        let mac = ConstraintValueInfo::new(
            ConstraintValue::testing_new("//constraints:mac"),
            linux.setting().dupe(),
        );
        let x86 = ConstraintValueInfo::testing_new("//constraints:x86_64", "//constraints:cpu");

        let parent = PlatformInfo::testing_new("//platforms:linux_x86", &[linux, x86.dupe()]);
        let child = PlatformInfo::new(
            TargetLabel::testing_parse("//platforms:mac_x86"),
            Some(&parent),
            &[mac.dupe()],
        )
        .unwrap();

        assert_eq!(Some(&mac), child.get(mac.setting().key()));
        assert_eq!(Some(&x86), child.get(x86.setting().key()));
        assert_eq!(2, child.constraints().count());
    }

    #[test]
    fn test_duplicate_setting_is_rejected() {
        let linux = ConstraintValueInfo::testing_new("//constraints:linux", "//constraints:os");
        let mac = ConstraintValueInfo::new(
            ConstraintValue::testing_new("//constraints:mac"),
            linux.setting().dupe(),
        );

        let res = PlatformInfo::new(
            TargetLabel::testing_parse("//platforms:both"),
            None,
            &[linux.dupe(), mac],
        );
        assert_matches!(res, Err(PlatformError::DuplicateConstraintValues { .. }));

        // Repeating the same value is harmless.
        assert!(
            PlatformInfo::new(
                TargetLabel::testing_parse("//platforms:linux"),
                None,
                &[linux.dupe(), linux],
            )
            .is_ok()
        );
    }
}
