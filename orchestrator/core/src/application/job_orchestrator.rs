// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Job Orchestrator
//!
//! Submits work items and follows them through the store-driven status
//! machine `Pending → InProgress → Succeeded | Failed`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Work item submission, polling and result retrieval

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::resource_catalog::ResourceCatalog;
use crate::domain::activity::OwnerScope;
use crate::domain::error::{OrchestrationError, ResourceKind};
use crate::domain::resource_store::ResourceStore;
use crate::domain::transfer::TransferGateway;
use crate::domain::work_item::{ActivityRef, WorkItem, WorkItemStatus};

type Result<T> = std::result::Result<T, OrchestrationError>;

/// Poll cadence for `await_completion`
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Sleep between status fetches
    pub interval: Duration,

    /// Stop waiting after this long; unbounded when `None`
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

#[derive(Clone)]
pub struct JobOrchestrator {
    catalog: ResourceCatalog,
    store: Arc<dyn ResourceStore>,
    transfer: Arc<dyn TransferGateway>,
    settings: PollSettings,
}

impl JobOrchestrator {
    pub fn new(
        catalog: ResourceCatalog,
        store: Arc<dyn ResourceStore>,
        transfer: Arc<dyn TransferGateway>,
        settings: PollSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            transfer,
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Submit a work item and wait until it finishes.
    ///
    /// Returns the URL of the `Result` output.
    pub async fn submit_work_item(
        &self,
        activity_id: &str,
        input_locator: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let work_item = self.submit(activity_id, input_locator).await?;
        self.await_completion(work_item, cancel).await
    }

    /// Submit a work item without waiting for it.
    ///
    /// The activity is resolved through the catalog to pick up its owner.
    /// An activity the catalog cannot see is still submitted; the store is
    /// the authority on whether it exists.
    pub async fn submit(&self, activity_id: &str, input_locator: &str) -> Result<WorkItem> {
        if activity_id.trim().is_empty() || input_locator.trim().is_empty() {
            return Err(OrchestrationError::InvalidArgument(
                "activity id and input locator must not be empty".to_string(),
            ));
        }

        let owner = match self.catalog.find_activity(activity_id).await {
            Ok(activity) => activity.owner_scope,
            Err(OrchestrationError::NotFound { .. }) => {
                debug!(activity_id, "Activity not visible to the catalog, submitting anyway");
                OwnerScope::default()
            }
            Err(e) => return Err(e),
        };

        let submission = WorkItem::for_activity(
            ActivityRef {
                owner,
                id: activity_id.to_string(),
            },
            input_locator,
        );

        let created = self
            .store
            .create_work_item(&submission)
            .await
            .map_err(|e| OrchestrationError::from_store(e, ResourceKind::Activity, activity_id))?;

        info!(
            work_item_id = created.display_id(),
            activity_id,
            "Submitted work item"
        );
        Ok(created)
    }

    /// Poll a submitted work item until it reaches a terminal status.
    pub async fn await_completion(&self, work_item: WorkItem, cancel: &CancellationToken) -> Result<String> {
        let work_item_id = work_item.id.clone().ok_or_else(|| {
            OrchestrationError::InvalidArgument("work item has not been submitted".to_string())
        })?;

        let owner = work_item.owner_scope.clone();

        let started = Instant::now();
        let deadline = self.settings.timeout.map(|t| started + t);
        let mut current = work_item;
        // Only the submission itself may arrive without a status
        if current.status.is_none() {
            current.status = Some(WorkItemStatus::Pending.as_str().to_string());
        }
        let mut fetches = 0u32;

        loop {
            if let Some(locator) = settle(&current, &work_item_id)? {
                info!(work_item_id = %work_item_id, fetches, "Work item succeeded");
                return Ok(locator);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(work_item_id = %work_item_id, fetches, "Gave up waiting for work item");
                        return Err(OrchestrationError::Timeout {
                            work_item_id,
                            waited_secs: started.elapsed().as_secs(),
                        });
                    }
                    self.settings.interval.min(deadline - now)
                }
                None => self.settings.interval,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(work_item_id = %work_item_id, fetches, "Stopped polling work item");
                    return Err(OrchestrationError::Cancelled(work_item_id));
                }
                _ = tokio::time::sleep(pause) => {}
            }

            current = self.fetch(&owner, &work_item_id).await?;
            fetches += 1;
            debug!(
                work_item_id = %work_item_id,
                status = current.status.as_deref().unwrap_or("<none>"),
                fetches,
                "Polled work item"
            );
        }
    }

    /// Fetch a fresh snapshot of a submitted work item.
    pub async fn poll_once(&self, work_item: &WorkItem) -> Result<WorkItem> {
        let id = work_item.id.as_deref().ok_or_else(|| {
            OrchestrationError::InvalidArgument("work item has not been submitted".to_string())
        })?;

        self.fetch(&work_item.owner_scope, id).await
    }

    async fn fetch(&self, owner: &OwnerScope, id: &str) -> Result<WorkItem> {
        self.store
            .get_work_item(owner, id)
            .await
            .map_err(|e| OrchestrationError::from_store(e, ResourceKind::WorkItem, id))
    }

    /// Download a result into `destination_dir`, named after the last path
    /// segment of the locator.
    pub async fn download_result(&self, result_locator: &str, destination_dir: &Path) -> Result<PathBuf> {
        let url = url::Url::parse(result_locator).map_err(|e| {
            OrchestrationError::InvalidArgument(format!("'{}' is not a URL: {}", result_locator, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OrchestrationError::InvalidArgument(format!(
                "unsupported result locator scheme '{}'",
                url.scheme()
            )));
        }

        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                OrchestrationError::InvalidArgument(format!(
                    "result locator '{}' does not name a file",
                    result_locator
                ))
            })?
            .to_string();

        let destination = destination_dir.join(file_name);
        self.transfer.download(result_locator, &destination).await?;
        info!(destination = ?destination, "Downloaded work item result");
        Ok(destination)
    }
}

/// `Some(locator)` once succeeded, `None` while still running.
fn settle(work_item: &WorkItem, work_item_id: &str) -> Result<Option<String>> {
    match work_item.parsed_status() {
        Ok(WorkItemStatus::Pending) | Ok(WorkItemStatus::InProgress) => Ok(None),
        Ok(WorkItemStatus::Succeeded) => match work_item.result_resource() {
            Some(locator) => Ok(Some(locator.to_string())),
            None => Err(OrchestrationError::RemoteRejection(format!(
                "work item {} succeeded without a result location",
                work_item_id
            ))),
        },
        Ok(WorkItemStatus::Failed) => {
            let details = work_item
                .status_details
                .clone()
                .unwrap_or_else(|| "no details reported".to_string());
            warn!(work_item_id, details = %details, "Work item failed");
            Err(OrchestrationError::WorkItemFailed {
                work_item_id: work_item_id.to_string(),
                details,
            })
        }
        Err(unknown) => Err(OrchestrationError::UnexpectedStatus(unknown.0)),
    }
}
