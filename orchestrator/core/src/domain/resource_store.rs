// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource Store Trait - Anti-Corruption Layer for the remote CAD IO service
//!
//! Abstracts the remote CRUD surface over Activities, AppPackages and
//! WorkItems, plus the two custom operations the catalog needs (upload URL
//! generation and package linking). Implementations carry the credential;
//! callers never see the wire format.
//!
//! Implemented in `crate::infrastructure::resource_store`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::activity::{Activity, OwnerScope};
use crate::domain::app_package::AppPackage;
use crate::domain::work_item::WorkItem;

/// Result of a remote delete.
///
/// Only `Confirmed` counts as a removal; anything else the store answered
/// with is reported back as `Unconfirmed` with its status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Confirmed,
    Unconfirmed(u16),
}

/// Remote resource store.
///
/// Listings return resources in the order the store reports them.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List every activity visible to the credential, owned and shared
    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError>;

    /// Register a new activity; returns it as the store recorded it
    async fn create_activity(&self, activity: &Activity) -> Result<Activity, StoreError>;

    /// Replace the script of an existing activity, leaving its parameters alone
    async fn patch_activity_script(&self, activity: &Activity, script: &str) -> Result<(), StoreError>;

    async fn delete_activity(&self, activity: &Activity) -> Result<DeleteOutcome, StoreError>;

    /// List every app package visible to the credential
    async fn list_app_packages(&self) -> Result<Vec<AppPackage>, StoreError>;

    /// Ask the store for a URL a package archive can be uploaded to
    async fn generate_upload_url(&self) -> Result<String, StoreError>;

    async fn create_app_package(&self, package: &AppPackage) -> Result<AppPackage, StoreError>;

    async fn delete_app_package(&self, package: &AppPackage) -> Result<DeleteOutcome, StoreError>;

    /// Reference `package` from `activity` so the engine loads it
    async fn link_app_package(&self, activity: &Activity, package: &AppPackage) -> Result<(), StoreError>;

    /// Submit a work item; the returned copy carries the store-assigned identity
    async fn create_work_item(&self, work_item: &WorkItem) -> Result<WorkItem, StoreError>;

    async fn get_work_item(&self, owner: &OwnerScope, id: &str) -> Result<WorkItem, StoreError>;
}

/// Resource store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
