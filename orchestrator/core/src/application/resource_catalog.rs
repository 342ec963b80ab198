// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource Catalog
//!
//! CRUD and link operations over activities and app packages. Every
//! listing is fetched fresh from the store; nothing is cached between calls.
//! Local validation (arguments, script, ownership, duplicates) always runs
//! before the first remote mutation.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Activity and app package lifecycle against the resource store

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::activity::{derive_result_file_name, Activity};
use crate::domain::app_package::AppPackage;
use crate::domain::error::{OrchestrationError, ResourceKind};
use crate::domain::resource_store::{DeleteOutcome, ResourceStore, StoreError};
use crate::domain::transfer::TransferGateway;
use crate::infrastructure::bundle_inspector::BundleInspector;

type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Clone)]
pub struct ResourceCatalog {
    store: Arc<dyn ResourceStore>,
    transfer: Arc<dyn TransferGateway>,
    inspector: Arc<BundleInspector>,
    required_engine_version: String,
}

impl ResourceCatalog {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        transfer: Arc<dyn TransferGateway>,
        inspector: Arc<BundleInspector>,
        required_engine_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transfer,
            inspector,
            required_engine_version: required_engine_version.into(),
        }
    }

    // ========================================================================
    // Activities
    // ========================================================================

    pub async fn list_activities(&self) -> Result<Vec<Activity>> {
        let activities = self.store.list_activities().await?;
        debug!(count = activities.len(), "Listed activities");
        Ok(activities)
    }

    /// `(id, script)` for every visible activity, in store order
    pub async fn activity_details(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .list_activities()
            .await?
            .into_iter()
            .map(|a| (a.id, a.script))
            .collect())
    }

    /// First activity with `id` in store order
    pub async fn find_activity(&self, id: &str) -> Result<Activity> {
        self.list_activities()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| OrchestrationError::NotFound {
                kind: ResourceKind::Activity,
                id: id.to_string(),
            })
    }

    pub async fn create_activity(&self, id: &str, script: &str) -> Result<Activity> {
        require_non_empty("activity id", id)?;
        require_non_empty("script", script)?;

        let existing = self.list_activities().await?;
        if existing.iter().any(|a| a.id == id) {
            return Err(OrchestrationError::DuplicateResource {
                kind: ResourceKind::Activity,
                id: id.to_string(),
            });
        }

        let draft = Activity::draft(id, script, self.required_engine_version.as_str())
            .ok_or(OrchestrationError::InvalidScript)?;

        let created = self.store.create_activity(&draft).await.map_err(|e| match e {
            StoreError::Conflict(_) => OrchestrationError::DuplicateResource {
                kind: ResourceKind::Activity,
                id: id.to_string(),
            },
            other => other.into(),
        })?;

        info!(
            activity_id = %created.id,
            result_file = created.result_file_name().unwrap_or_default(),
            "Created activity"
        );
        Ok(created)
    }

    /// Replace the script of an owned activity.
    ///
    /// Parameters registered with the activity are left as they were.
    pub async fn update_activity(&self, id: &str, script: &str) -> Result<Activity> {
        require_non_empty("activity id", id)?;
        require_non_empty("script", script)?;
        derive_result_file_name(script).ok_or(OrchestrationError::InvalidScript)?;

        let mut activity = self.find_activity(id).await?;
        if activity.is_shared() {
            return Err(OrchestrationError::Forbidden {
                kind: ResourceKind::Activity,
                id: id.to_string(),
            });
        }

        self.store
            .patch_activity_script(&activity, script)
            .await
            .map_err(|e| OrchestrationError::from_store(e, ResourceKind::Activity, id))?;

        info!(activity_id = %id, "Updated activity script");
        activity.script = script.to_string();
        Ok(activity)
    }

    pub async fn delete_activity(&self, id: &str) -> Result<()> {
        require_non_empty("activity id", id)?;

        let activity = self.find_activity(id).await?;
        if activity.is_shared() {
            return Err(OrchestrationError::Forbidden {
                kind: ResourceKind::Activity,
                id: id.to_string(),
            });
        }

        let outcome = self
            .store
            .delete_activity(&activity)
            .await
            .map_err(|e| OrchestrationError::from_store(e, ResourceKind::Activity, id))?;
        confirm_deleted(outcome, ResourceKind::Activity, id)?;

        info!(activity_id = %id, "Deleted activity");
        Ok(())
    }

    // ========================================================================
    // App packages
    // ========================================================================

    pub async fn list_app_packages(&self) -> Result<Vec<AppPackage>> {
        let packages = self.store.list_app_packages().await?;
        debug!(count = packages.len(), "Listed app packages");
        Ok(packages)
    }

    /// `(id, resource)` for every visible app package, in store order
    pub async fn app_package_details(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .list_app_packages()
            .await?
            .into_iter()
            .map(|p| (p.id, p.resource))
            .collect())
    }

    pub async fn find_app_package(&self, id: &str) -> Result<AppPackage> {
        self.list_app_packages()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| OrchestrationError::NotFound {
                kind: ResourceKind::AppPackage,
                id: id.to_string(),
            })
    }

    /// Validate and package a local bundle, then register it.
    pub async fn create_app_package_from_bundle(&self, id: &str, bundle_path: &Path) -> Result<AppPackage> {
        require_non_empty("app package id", id)?;

        let handle = self.inspector.validate_bundle(bundle_path)?;
        let archive = self.inspector.package(&handle)?;
        debug!(app_package_id = %id, archive = ?archive, "Packaged bundle");

        self.create_app_package_from_zip(id, &archive).await
    }

    /// Upload an archive and register it as an app package.
    ///
    /// The archive must exist even when a package with the same id is
    /// already registered; that package is then returned as-is without
    /// uploading anything.
    pub async fn create_app_package_from_zip(&self, id: &str, archive_path: &Path) -> Result<AppPackage> {
        require_non_empty("app package id", id)?;

        if !archive_path.is_file() {
            return Err(OrchestrationError::NotFound {
                kind: ResourceKind::AppPackage,
                id: archive_path.display().to_string(),
            });
        }

        if let Some(existing) = self
            .list_app_packages()
            .await?
            .into_iter()
            .find(|p| p.id == id)
        {
            info!(app_package_id = %id, "App package already registered");
            return Ok(existing);
        }

        let upload_url = self.store.generate_upload_url().await?;
        self.transfer.upload(&upload_url, archive_path).await?;
        debug!(app_package_id = %id, "Uploaded package archive");

        let draft = AppPackage::draft(id, upload_url.as_str(), self.required_engine_version.as_str());
        match self.store.create_app_package(&draft).await {
            Ok(created) => {
                info!(app_package_id = %created.id, "Created app package");
                Ok(created)
            }
            Err(e) => {
                warn!(
                    app_package_id = %id,
                    resource = %upload_url,
                    "Registration failed after upload: {}",
                    e
                );
                Err(OrchestrationError::OrphanedUpload {
                    id: id.to_string(),
                    resource: upload_url,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Make `activity_id` load `package_id`. Linking an already linked pair
    /// succeeds without changing anything.
    pub async fn link_app_package(&self, activity_id: &str, package_id: &str) -> Result<()> {
        require_non_empty("activity id", activity_id)?;
        require_non_empty("app package id", package_id)?;

        let activity = self.find_activity(activity_id).await?;
        let package = self.find_app_package(package_id).await?;

        if activity.is_linked_to(package_id) {
            debug!(activity_id, package_id, "App package already linked");
            return Ok(());
        }

        match self.store.link_app_package(&activity, &package).await {
            Ok(()) => {
                info!(activity_id, package_id, "Linked app package");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => {
                debug!(activity_id, package_id, "Store reports link already present");
                Ok(())
            }
            Err(e) => Err(OrchestrationError::from_store(e, ResourceKind::Activity, activity_id)),
        }
    }

    pub async fn delete_app_package(&self, id: &str) -> Result<()> {
        require_non_empty("app package id", id)?;

        let package = self.find_app_package(id).await?;
        if package.is_shared() {
            return Err(OrchestrationError::Forbidden {
                kind: ResourceKind::AppPackage,
                id: id.to_string(),
            });
        }

        let outcome = self
            .store
            .delete_app_package(&package)
            .await
            .map_err(|e| OrchestrationError::from_store(e, ResourceKind::AppPackage, id))?;
        confirm_deleted(outcome, ResourceKind::AppPackage, id)?;

        info!(app_package_id = %id, "Deleted app package");
        Ok(())
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OrchestrationError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn confirm_deleted(outcome: DeleteOutcome, kind: ResourceKind, id: &str) -> Result<()> {
    match outcome {
        DeleteOutcome::Confirmed => Ok(()),
        DeleteOutcome::Unconfirmed(status) => {
            warn!(%kind, id, status, "Store did not confirm deletion");
            Err(OrchestrationError::RemoteRejection(format!(
                "deletion of {} '{}' was not confirmed (HTTP {})",
                kind, id, status
            )))
        }
    }
}
