// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Activity
//!
//! A registered, reusable job definition: an engine script plus a fixed
//! one-input / one-output parameter contract.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Activity entity, owner scope and result file derivation

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Name of the sole input parameter every activity declares
pub const HOST_DWG_PARAMETER: &str = "HostDwg";

/// Local file name the engine substitutes for the host drawing
pub const HOST_DWG_PLACEHOLDER: &str = "$(HostDwg)";

/// Name of the sole output parameter every activity declares
pub const RESULT_PARAMETER: &str = "Result";

/// Owner tag the store uses for system-provided resources
pub const SHARED_OWNER_TAG: &str = "Shared";

static RESULT_FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)result.[a-z]{3}").expect("result file pattern is valid"));

/// Who owns a remote resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerScope {
    /// Owned by the authenticated credential (carries the store-assigned owner id)
    Owned(String),
    /// Provided by the service, read-only for this client
    Shared,
}

impl OwnerScope {
    /// Map the store's owner tag into a scope.
    pub fn from_tag(tag: &str) -> Self {
        if tag == SHARED_OWNER_TAG {
            OwnerScope::Shared
        } else {
            OwnerScope::Owned(tag.to_string())
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            OwnerScope::Owned(owner) => owner,
            OwnerScope::Shared => SHARED_OWNER_TAG,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, OwnerScope::Shared)
    }
}

impl Default for OwnerScope {
    fn default() -> Self {
        OwnerScope::Owned(String::new())
    }
}

/// Binding between a named parameter and the file the script sees locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub local_file_name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, local_file_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_file_name: local_file_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub owner_scope: OwnerScope,
    pub version: u32,
    pub script: String,
    pub required_engine_version: String,
    pub input_parameters: Vec<Parameter>,
    pub output_parameters: Vec<Parameter>,
    #[serde(default)]
    pub linked_package_ids: BTreeSet<String>,
}

impl Activity {
    /// Build a not-yet-registered activity from a script.
    ///
    /// Returns `None` when the script does not name a result file.
    pub fn draft(
        id: impl Into<String>,
        script: impl Into<String>,
        required_engine_version: impl Into<String>,
    ) -> Option<Self> {
        let script = script.into();
        let result_file = derive_result_file_name(&script)?;

        Some(Self {
            id: id.into(),
            owner_scope: OwnerScope::default(),
            version: 1,
            script,
            required_engine_version: required_engine_version.into(),
            input_parameters: vec![Parameter::new(HOST_DWG_PARAMETER, HOST_DWG_PLACEHOLDER)],
            output_parameters: vec![Parameter::new(RESULT_PARAMETER, result_file)],
            linked_package_ids: BTreeSet::new(),
        })
    }

    pub fn is_shared(&self) -> bool {
        self.owner_scope.is_shared()
    }

    pub fn is_linked_to(&self, package_id: &str) -> bool {
        self.linked_package_ids.contains(package_id)
    }

    /// Local file name of the result the script produces
    pub fn result_file_name(&self) -> Option<&str> {
        self.output_parameters
            .first()
            .map(|p| p.local_file_name.as_str())
    }
}

/// Scan a script for the file it writes its result to.
///
/// Matches `result` followed by any character and a three letter extension,
/// case-insensitively (`result.pdf`, `Result.dwf`, `RESULT.DWG`). When the
/// script names several, the last one wins.
pub fn derive_result_file_name(script: &str) -> Option<String> {
    RESULT_FILE_PATTERN
        .find_iter(script)
        .last()
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_result_token() {
        let script = "_.tilemode 0 -export _pdf _all result.pdf\n";
        assert_eq!(derive_result_file_name(script).as_deref(), Some("result.pdf"));
    }

    #[test]
    fn test_case_insensitive_match_keeps_original_case() {
        assert_eq!(
            derive_result_file_name("_.saveas 2013 RESULT.DWG").as_deref(),
            Some("RESULT.DWG")
        );
        assert_eq!(
            derive_result_file_name("-export Result.dwf").as_deref(),
            Some("Result.dwf")
        );
    }

    #[test]
    fn test_last_match_wins() {
        let script = "(command \"_-export\" \"result.txt\")\n(command \"_-plot\" \"result.pdf\")";
        assert_eq!(derive_result_file_name(script).as_deref(), Some("result.pdf"));
    }

    #[test]
    fn test_no_result_token() {
        assert_eq!(derive_result_file_name("_.zoom _extents"), None);
        assert_eq!(derive_result_file_name("results"), None);
        assert_eq!(derive_result_file_name(""), None);
    }

    #[test]
    fn test_draft_builds_fixed_parameter_contract() {
        let activity = Activity::draft("PlotToPdf", "-export _pdf result.pdf", "20.0").unwrap();

        assert_eq!(activity.version, 1);
        assert_eq!(activity.input_parameters, vec![Parameter::new("HostDwg", "$(HostDwg)")]);
        assert_eq!(activity.output_parameters, vec![Parameter::new("Result", "result.pdf")]);
        assert_eq!(activity.result_file_name(), Some("result.pdf"));
        assert!(Activity::draft("Bad", "_.zoom", "20.0").is_none());
    }

    #[test]
    fn test_owner_scope_from_tag() {
        assert!(OwnerScope::from_tag("Shared").is_shared());
        let owned = OwnerScope::from_tag("client-123");
        assert!(!owned.is_shared());
        assert_eq!(owned.tag(), "client-123");
    }
}
