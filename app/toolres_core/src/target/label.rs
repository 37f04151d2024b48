/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::str::FromStr;
use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum TargetLabelParseError {
    #[error("Label `{0}` must start with `//` or `cell//`")]
    NotAbsolute(String),
    #[error("Label `{0}` has an invalid cell name")]
    InvalidCell(String),
    #[error("Label `{0}` has an invalid package path")]
    InvalidPackage(String),
    #[error("Label `{0}` has an empty or invalid target name")]
    InvalidName(String),
}

/// An absolute label of a declared target, e.g. `//platforms:linux` or
/// `root//toolchains/cxx:clang`.
///
/// Labels are stored in canonical form (`cell//package:name`, the cell is omitted
/// when empty), so equality and ordering are textual.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
pub struct TargetLabel(Arc<str>);

impl TargetLabel {
    pub fn parse(label: &str) -> Result<TargetLabel, TargetLabelParseError> {
        let Some((cell, rest)) = label.split_once("//") else {
            return Err(TargetLabelParseError::NotAbsolute(label.to_owned()));
        };
        if !cell
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(TargetLabelParseError::InvalidCell(label.to_owned()));
        }

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package, name),
            // `//foo/bar` is shorthand for `//foo/bar:bar`.
            None => (rest, rest.rsplit('/').next().unwrap_or(rest)),
        };

        if package.starts_with('/')
            || package.ends_with('/')
            || package.contains("//")
            || package.contains(':')
        {
            return Err(TargetLabelParseError::InvalidPackage(label.to_owned()));
        }
        if name.is_empty() || name.contains(':') || name.contains("//") || name.ends_with('/') {
            return Err(TargetLabelParseError::InvalidName(label.to_owned()));
        }

        Ok(TargetLabel(Arc::from(format!("{cell}//{package}:{name}"))))
    }

    /// Parse a label known to be valid. Panics otherwise.
    pub fn testing_parse(label: &str) -> TargetLabel {
        TargetLabel::parse(label).unwrap()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cell(&self) -> &str {
        self.0.split_once("//").map_or("", |(cell, _)| cell)
    }

    pub fn package(&self) -> &str {
        let rest = self.0.split_once("//").map_or(&*self.0, |(_, rest)| rest);
        rest.rsplit_once(':').map_or(rest, |(package, _)| package)
    }

    pub fn name(&self) -> &str {
        self.0.rsplit_once(':').map_or(&*self.0, |(_, name)| name)
    }
}

impl FromStr for TargetLabel {
    type Err = TargetLabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetLabel::parse(s)
    }
}

impl Serialize for TargetLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TargetLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TargetLabel::parse(&s).map_err(serde::de::Error::custom)
    }
}
