/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Loaded target declarations, as far as toolchain resolution needs them.

use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use toolres_core::target::label::TargetLabel;
use toolres_graph::DepsEnv;
use toolres_graph::InjectedKey;

use crate::error::LookupFailure;

#[derive(Clone, Debug, Eq, PartialEq, Hash, Allocative)]
pub enum TargetDeclaration {
    ConstraintSetting {
        default_constraint_value: Option<TargetLabel>,
    },
    ConstraintValue {
        constraint_setting: TargetLabel,
    },
    Platform {
        constraint_values: Vec<TargetLabel>,
        parent: Option<TargetLabel>,
    },
    ToolchainType,
    Toolchain {
        toolchain_type: TargetLabel,
        exec_compatible_with: Vec<TargetLabel>,
        target_compatible_with: Vec<TargetLabel>,
        toolchain: TargetLabel,
    },
    /// Any rule kind resolution has no use for.
    Other { rule_type: String },
}

impl TargetDeclaration {
    pub fn rule_type(&self) -> &str {
        match self {
            TargetDeclaration::ConstraintSetting { .. } => "constraint_setting",
            TargetDeclaration::ConstraintValue { .. } => "constraint_value",
            TargetDeclaration::Platform { .. } => "platform",
            TargetDeclaration::ToolchainType => "toolchain_type",
            TargetDeclaration::Toolchain { .. } => "toolchain",
            TargetDeclaration::Other { rule_type } => rule_type,
        }
    }

    pub(crate) fn wrong_kind(&self) -> LookupFailure {
        LookupFailure::WrongKind(self.rule_type().to_owned())
    }
}

/// The declaration of a target, injected once the target's package is loaded.
#[derive(Clone, Dupe, Debug, Display, Eq, Hash, PartialEq, Allocative)]
#[display("{}", _0)]
pub struct TargetDeclarationKey(pub TargetLabel);

impl InjectedKey for TargetDeclarationKey {
    type Value = Arc<TargetDeclaration>;
}

/// Read a declaration. An undeclared label is reported as such, so callers can turn
/// it into an invalid reference of whatever kind they were looking for.
pub(crate) fn declaration<E: DepsEnv + ?Sized>(
    env: &mut E,
    label: &TargetLabel,
) -> Result<Arc<TargetDeclaration>, LookupFailure> {
    env.injected(&TargetDeclarationKey(label.dupe()))
        .map_err(LookupFailure::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type() {
        assert_eq!("toolchain_type", TargetDeclaration::ToolchainType.rule_type());
        assert_eq!(
            "genrule",
            TargetDeclaration::Other {
                rule_type: "genrule".to_owned()
            }
            .rule_type()
        );
        assert_eq!(
            LookupFailure::WrongKind("platform".to_owned()),
            TargetDeclaration::Platform {
                constraint_values: Vec::new(),
                parent: None,
            }
            .wrong_kind()
        );
    }
}
