// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Work Item
//!
//! One concrete job execution bound to an activity, with resolved input and
//! output resource locations.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** WorkItem entity and its status state machine

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::activity::{OwnerScope, HOST_DWG_PARAMETER, RESULT_PARAMETER};

/// Storage provider kind for plain URL resources
pub const GENERIC_STORAGE_PROVIDER: &str = "Generic";

/// Status reported by the store.
///
/// `Pending` → `InProgress` → `Succeeded` | `Failed`. The store drives every
/// transition; the client only observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItemStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl WorkItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkItemStatus::Succeeded | WorkItemStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemStatus::Pending => "Pending",
            WorkItemStatus::InProgress => "InProgress",
            WorkItemStatus::Succeeded => "Succeeded",
            WorkItemStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reported in place of a status the store left out
pub const MISSING_STATUS: &str = "<missing>";

/// Status string outside the defined state machine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized work item status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for WorkItemStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(WorkItemStatus::Pending),
            "InProgress" => Ok(WorkItemStatus::InProgress),
            "Succeeded" => Ok(WorkItemStatus::Succeeded),
            "Failed" => Ok(WorkItemStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    /// Unset for outputs until the store assigns a retrievable URL
    pub resource: Option<String>,
    pub storage_provider: String,
    pub http_verb: HttpVerb,
}

/// Identity of the activity a work item runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRef {
    pub owner: OwnerScope,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Assigned by the store on submission
    pub id: Option<String>,
    pub owner_scope: OwnerScope,
    pub activity: ActivityRef,
    pub input_arguments: Vec<Argument>,
    pub output_arguments: Vec<Argument>,
    /// Raw status string as the store reported it
    pub status: Option<String>,
    /// Diagnostic the store attaches when a work item fails
    pub status_details: Option<String>,
}

impl WorkItem {
    /// Build a submission for `activity` reading its drawing from `input_resource`.
    pub fn for_activity(activity: ActivityRef, input_resource: impl Into<String>) -> Self {
        Self {
            id: None,
            owner_scope: OwnerScope::default(),
            activity,
            input_arguments: vec![Argument {
                name: HOST_DWG_PARAMETER.to_string(),
                resource: Some(input_resource.into()),
                storage_provider: GENERIC_STORAGE_PROVIDER.to_string(),
                http_verb: HttpVerb::Get,
            }],
            output_arguments: vec![Argument {
                name: RESULT_PARAMETER.to_string(),
                resource: None,
                storage_provider: GENERIC_STORAGE_PROVIDER.to_string(),
                http_verb: HttpVerb::Post,
            }],
            status: None,
            status_details: None,
        }
    }

    /// Parse the reported status into the state machine.
    ///
    /// A snapshot without a status is outside the state machine too.
    pub fn parsed_status(&self) -> Result<WorkItemStatus, UnknownStatus> {
        match self.status.as_deref() {
            None => Err(UnknownStatus(MISSING_STATUS.to_string())),
            Some(s) => s.parse(),
        }
    }

    /// Resolved location of the `Result` output, once the store assigned one
    pub fn result_resource(&self) -> Option<&str> {
        self.output_arguments
            .iter()
            .find(|a| a.name == RESULT_PARAMETER)
            .and_then(|a| a.resource.as_deref())
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<unsubmitted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity_ref() -> ActivityRef {
        ActivityRef {
            owner: OwnerScope::Shared,
            id: "PlotToPDF".to_string(),
        }
    }

    #[test]
    fn test_for_activity_argument_shape() {
        let wi = WorkItem::for_activity(activity_ref(), "https://bucket/host.dwg");

        assert_eq!(wi.input_arguments.len(), 1);
        assert_eq!(wi.input_arguments[0].name, "HostDwg");
        assert_eq!(wi.input_arguments[0].resource.as_deref(), Some("https://bucket/host.dwg"));
        assert_eq!(wi.input_arguments[0].http_verb, HttpVerb::Get);
        assert_eq!(wi.input_arguments[0].storage_provider, "Generic");

        assert_eq!(wi.output_arguments.len(), 1);
        assert_eq!(wi.output_arguments[0].name, "Result");
        assert_eq!(wi.output_arguments[0].resource, None);
        assert_eq!(wi.output_arguments[0].http_verb, HttpVerb::Post);
        assert!(wi.id.is_none());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Pending".parse::<WorkItemStatus>(), Ok(WorkItemStatus::Pending));
        assert_eq!("InProgress".parse::<WorkItemStatus>(), Ok(WorkItemStatus::InProgress));
        assert!("Succeeded".parse::<WorkItemStatus>().unwrap().is_terminal());
        assert!("Failed".parse::<WorkItemStatus>().unwrap().is_terminal());
        assert_eq!(
            "FailedDownload".parse::<WorkItemStatus>(),
            Err(UnknownStatus("FailedDownload".to_string()))
        );
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let wi = WorkItem::for_activity(activity_ref(), "https://bucket/host.dwg");
        assert_eq!(wi.parsed_status(), Err(UnknownStatus(MISSING_STATUS.to_string())));
    }
}
