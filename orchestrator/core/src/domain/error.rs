// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestration Errors
//!
//! Tagged error type returned by every catalog, bundle and work item
//! operation. Validation kinds are produced locally before any remote
//! mutation; transport and remote kinds are surfaced as the store reported
//! them. Nothing in the core retries.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Single error vocabulary for callers to pattern-match on

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::resource_store::StoreError;
use crate::domain::transfer::TransferError;

/// Which kind of remote resource an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Activity,
    AppPackage,
    WorkItem,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Activity => write!(f, "activity"),
            ResourceKind::AppPackage => write!(f, "app package"),
            ResourceKind::WorkItem => write!(f, "work item"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Session is not initialized: {0}")]
    NotInitialized(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("{kind} '{id}' already exists")]
    DuplicateResource { kind: ResourceKind, id: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} '{id}' is shared and cannot be modified")]
    Forbidden { kind: ResourceKind, id: String },

    #[error("Could not identify the result output file in the script; use result.* as the script output")]
    InvalidScript,

    #[error("{0:?} is not a bundle: PackageContents.xml not found")]
    NotABundle(PathBuf),

    #[error("Packaging failed: {0}")]
    PackagingFailed(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Remote store rejected the request: {0}")]
    RemoteRejection(String),

    #[error("Unexpected work item status: '{0}'")]
    UnexpectedStatus(String),

    #[error("Work item {work_item_id} did not finish within {waited_secs}s")]
    Timeout { work_item_id: String, waited_secs: u64 },

    #[error("Polling of work item {0} was cancelled")]
    Cancelled(String),

    #[error("Work item {work_item_id} failed: {details}")]
    WorkItemFailed { work_item_id: String, details: String },

    #[error("App package '{id}' was uploaded to {resource} but registration failed ({reason}); the uploaded archive is orphaned")]
    OrphanedUpload {
        id: String,
        resource: String,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Whether a caller may reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestrationError::TransportError(_) | OrchestrationError::Timeout { .. }
        )
    }

    pub(crate) fn from_store(err: StoreError, kind: ResourceKind, id: &str) -> Self {
        match err {
            StoreError::NotFound(_) => OrchestrationError::NotFound {
                kind,
                id: id.to_string(),
            },
            other => other.into(),
        }
    }
}

impl From<StoreError> for OrchestrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transport(msg) => OrchestrationError::TransportError(msg),
            StoreError::Unauthorized(msg) => OrchestrationError::AuthFailed(msg),
            StoreError::NotFound(msg) => OrchestrationError::RemoteRejection(format!("not found: {}", msg)),
            StoreError::Conflict(msg) => OrchestrationError::RemoteRejection(format!("conflict: {}", msg)),
            StoreError::Rejected { status, message } => {
                OrchestrationError::RemoteRejection(format!("HTTP {}: {}", status, message))
            }
            StoreError::Serialization(msg) => {
                OrchestrationError::RemoteRejection(format!("malformed response: {}", msg))
            }
        }
    }
}

impl From<TransferError> for OrchestrationError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io(e) => OrchestrationError::Io(e),
            other => OrchestrationError::TransportError(other.to_string()),
        }
    }
}
