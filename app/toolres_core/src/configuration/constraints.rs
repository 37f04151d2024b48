/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Constraints are the building block of platforms.
//!
//! A constraint is identified by a "constraint key" defined by a `constraint_setting()`
//! target. There may be multiple possible values for the constraint, each defined by a
//! `constraint_value()` target.
//!
//! A platform has at most a single value for each constraint. When it has none, the
//! setting's default value (if any) applies.

use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;

use crate::target::label::TargetLabel;

/// A ConstraintKey is a label for a `constraint_setting()` target.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
pub struct ConstraintKey(pub TargetLabel);

impl ConstraintKey {
    pub fn testing_new(label: &str) -> ConstraintKey {
        ConstraintKey(TargetLabel::testing_parse(label))
    }
}

/// A ConstraintValue is a label for a `constraint_value()` target.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
pub struct ConstraintValue(pub TargetLabel);

impl ConstraintValue {
    pub fn testing_new(label: &str) -> ConstraintValue {
        ConstraintValue(TargetLabel::testing_parse(label))
    }
}

/// A loaded `constraint_setting()`.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Allocative)]
#[display("{}", _0.key)]
pub struct ConstraintSettingInfo(Arc<ConstraintSettingInfoData>);

#[derive(Debug, Hash, Eq, PartialEq, Allocative)]
struct ConstraintSettingInfoData {
    key: ConstraintKey,
    default_value: Option<ConstraintValue>,
}

impl ConstraintSettingInfo {
    pub fn new(key: ConstraintKey, default_value: Option<ConstraintValue>) -> Self {
        Self(Arc::new(ConstraintSettingInfoData { key, default_value }))
    }

    pub fn key(&self) -> &ConstraintKey {
        &self.0.key
    }

    /// Value used by platforms that don't set this constraint explicitly.
    pub fn default_value(&self) -> Option<&ConstraintValue> {
        self.0.default_value.as_ref()
    }
}

/// A loaded `constraint_value()` together with the setting it belongs to.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Allocative)]
#[display("{}", _0.value)]
pub struct ConstraintValueInfo(Arc<ConstraintValueInfoData>);

#[derive(Debug, Hash, Eq, PartialEq, Allocative)]
struct ConstraintValueInfoData {
    value: ConstraintValue,
    setting: ConstraintSettingInfo,
}

impl ConstraintValueInfo {
    pub fn new(value: ConstraintValue, setting: ConstraintSettingInfo) -> Self {
        Self(Arc::new(ConstraintValueInfoData { value, setting }))
    }

    pub fn value(&self) -> &ConstraintValue {
        &self.0.value
    }

    pub fn label(&self) -> &TargetLabel {
        &self.0.value.0
    }

    pub fn setting(&self) -> &ConstraintSettingInfo {
        &self.0.setting
    }

    /// Build a setting and one value for it in one go.
    pub fn testing_new(value: &str, setting: &str) -> ConstraintValueInfo {
        ConstraintValueInfo::new(
            ConstraintValue::testing_new(value),
            ConstraintSettingInfo::new(ConstraintKey::testing_new(setting), None),
        )
    }
}
