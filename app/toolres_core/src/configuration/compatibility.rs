/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;

use allocative::Allocative;
use dupe::Dupe;

use crate::configuration::constraints::ConstraintKey;
use crate::configuration::constraints::ConstraintValue;
use crate::configuration::constraints::ConstraintValueInfo;
use crate::configuration::platform::PlatformInfo;

/// The first required constraint value a platform failed to satisfy.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Allocative)]
pub struct UnsatisfiedConstraint {
    pub required: ConstraintValue,
    pub setting: ConstraintKey,
    /// What the platform has for the setting instead. Never `None` in practice: an
    /// unconstrained setting is compatible with anything.
    pub actual: Option<ConstraintValue>,
}

impl fmt::Display for UnsatisfiedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "`{}` is required but `{}` is set to `{}`",
                self.required, self.setting, actual
            ),
            None => write!(f, "`{}` is required", self.required),
        }
    }
}

/// Check that `platform` satisfies every value in `required`.
///
/// A platform satisfies a value when its effective value for the value's setting (its
/// own value, else the setting default) is that value. A setting with neither is
/// unconstrained on the platform and satisfies any value.
pub fn check_compatible<'a>(
    platform: &PlatformInfo,
    required: impl IntoIterator<Item = &'a ConstraintValueInfo>,
) -> Result<(), UnsatisfiedConstraint> {
    for value in required {
        match platform.effective_value(value.setting()) {
            None => {}
            Some(actual) if actual == value.value() => {}
            Some(actual) => {
                return Err(UnsatisfiedConstraint {
                    required: value.value().dupe(),
                    setting: value.setting().key().dupe(),
                    actual: Some(actual.dupe()),
                });
            }
        }
    }
    Ok(())
}

pub fn compatible<'a>(
    platform: &PlatformInfo,
    required: impl IntoIterator<Item = &'a ConstraintValueInfo>,
) -> bool {
    check_compatible(platform, required).is_ok()
}
