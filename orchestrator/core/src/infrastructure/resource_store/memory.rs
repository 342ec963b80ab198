// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory Resource Store
//!
//! Process-local stand-in for the remote store. Used by tests and offline
//! runs: records every call, lets a caller script the status sequence a
//! work item reports, and can fail the next call of a given operation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::domain::activity::{Activity, OwnerScope};
use crate::domain::app_package::AppPackage;
use crate::domain::resource_store::{DeleteOutcome, ResourceStore, StoreError};
use crate::domain::work_item::WorkItem;

/// Operations a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListActivities,
    CreateActivity,
    PatchActivityScript,
    DeleteActivity,
    ListAppPackages,
    GenerateUploadUrl,
    CreateAppPackage,
    DeleteAppPackage,
    LinkAppPackage,
    CreateWorkItem,
    GetWorkItem,
}

/// How many times each operation was invoked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_activities: usize,
    pub create_activity: usize,
    pub patch_activity_script: usize,
    pub delete_activity: usize,
    pub list_app_packages: usize,
    pub generate_upload_url: usize,
    pub create_app_package: usize,
    pub delete_app_package: usize,
    pub link_app_package: usize,
    pub create_work_item: usize,
    pub get_work_item: usize,
}

impl CallCounts {
    fn record(&mut self, op: StoreOperation) {
        let counter = match op {
            StoreOperation::ListActivities => &mut self.list_activities,
            StoreOperation::CreateActivity => &mut self.create_activity,
            StoreOperation::PatchActivityScript => &mut self.patch_activity_script,
            StoreOperation::DeleteActivity => &mut self.delete_activity,
            StoreOperation::ListAppPackages => &mut self.list_app_packages,
            StoreOperation::GenerateUploadUrl => &mut self.generate_upload_url,
            StoreOperation::CreateAppPackage => &mut self.create_app_package,
            StoreOperation::DeleteAppPackage => &mut self.delete_app_package,
            StoreOperation::LinkAppPackage => &mut self.link_app_package,
            StoreOperation::CreateWorkItem => &mut self.create_work_item,
            StoreOperation::GetWorkItem => &mut self.get_work_item,
        };
        *counter += 1;
    }

    /// Calls that change remote state
    pub fn mutations(&self) -> usize {
        self.create_activity
            + self.patch_activity_script
            + self.delete_activity
            + self.generate_upload_url
            + self.create_app_package
            + self.delete_app_package
            + self.link_app_package
            + self.create_work_item
    }
}

#[derive(Default)]
struct State {
    activities: Vec<Activity>,
    packages: Vec<AppPackage>,
    work_items: HashMap<String, WorkItem>,
    status_scripts: HashMap<String, VecDeque<String>>,
    default_status_script: Vec<String>,
    failures: HashMap<StoreOperation, StoreError>,
    delete_outcome: Option<DeleteOutcome>,
    calls: CallCounts,
    next_id: u64,
}

pub struct InMemoryResourceStore {
    owner: String,
    result_base_url: String,
    state: Mutex<State>,
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new("local-client")
    }
}

impl InMemoryResourceStore {
    /// `owner` is the id the store stamps on everything this client creates.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            result_base_url: "https://memory.local/results".to_string(),
            state: Mutex::new(State {
                default_status_script: vec!["Succeeded".to_string()],
                ..Default::default()
            }),
        }
    }

    pub fn owner(&self) -> OwnerScope {
        OwnerScope::Owned(self.owner.clone())
    }

    /// Seed an activity as the store would already hold it.
    pub fn insert_activity(&self, activity: Activity) {
        self.state.lock().activities.push(activity);
    }

    pub fn insert_app_package(&self, package: AppPackage) {
        self.state.lock().packages.push(package);
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.state.lock().activities.clone()
    }

    pub fn app_packages(&self) -> Vec<AppPackage> {
        self.state.lock().packages.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls.clone()
    }

    /// Statuses reported by successive fetches of newly submitted work items.
    ///
    /// The last entry repeats once the sequence is exhausted.
    pub fn script_statuses<I, S>(&self, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().default_status_script = statuses.into_iter().map(Into::into).collect();
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: StoreOperation, error: StoreError) {
        self.state.lock().failures.insert(op, error);
    }

    /// Answer every delete with `outcome` instead of confirming it.
    pub fn set_delete_outcome(&self, outcome: DeleteOutcome) {
        self.state.lock().delete_outcome = Some(outcome);
    }

    fn begin(&self, op: StoreOperation) -> Result<parking_lot::MutexGuard<'_, State>, StoreError> {
        let mut state = self.state.lock();
        state.calls.record(op);
        match state.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError> {
        let state = self.begin(StoreOperation::ListActivities)?;
        Ok(state.activities.clone())
    }

    async fn create_activity(&self, activity: &Activity) -> Result<Activity, StoreError> {
        let mut state = self.begin(StoreOperation::CreateActivity)?;
        if state.activities.iter().any(|a| a.id == activity.id) {
            return Err(StoreError::Conflict(format!("Activities({})", activity.id)));
        }

        let mut created = activity.clone();
        created.owner_scope = self.owner();
        state.activities.push(created.clone());
        Ok(created)
    }

    async fn patch_activity_script(&self, activity: &Activity, script: &str) -> Result<(), StoreError> {
        let mut state = self.begin(StoreOperation::PatchActivityScript)?;
        let stored = state
            .activities
            .iter_mut()
            .find(|a| a.id == activity.id && a.owner_scope == activity.owner_scope)
            .ok_or_else(|| StoreError::NotFound(format!("Activities({})", activity.id)))?;
        stored.script = script.to_string();
        stored.version += 1;
        Ok(())
    }

    async fn delete_activity(&self, activity: &Activity) -> Result<DeleteOutcome, StoreError> {
        let mut state = self.begin(StoreOperation::DeleteActivity)?;
        if let Some(outcome) = state.delete_outcome {
            return Ok(outcome);
        }
        let before = state.activities.len();
        state
            .activities
            .retain(|a| !(a.id == activity.id && a.owner_scope == activity.owner_scope));
        if state.activities.len() == before {
            return Err(StoreError::NotFound(format!("Activities({})", activity.id)));
        }
        Ok(DeleteOutcome::Confirmed)
    }

    async fn list_app_packages(&self) -> Result<Vec<AppPackage>, StoreError> {
        let state = self.begin(StoreOperation::ListAppPackages)?;
        Ok(state.packages.clone())
    }

    async fn generate_upload_url(&self) -> Result<String, StoreError> {
        let mut state = self.begin(StoreOperation::GenerateUploadUrl)?;
        state.next_id += 1;
        Ok(format!("https://memory.local/uploads/{}", state.next_id))
    }

    async fn create_app_package(&self, package: &AppPackage) -> Result<AppPackage, StoreError> {
        let mut state = self.begin(StoreOperation::CreateAppPackage)?;
        if state.packages.iter().any(|p| p.id == package.id) {
            return Err(StoreError::Conflict(format!("AppPackages({})", package.id)));
        }

        let mut created = package.clone();
        created.owner_scope = self.owner();
        state.packages.push(created.clone());
        Ok(created)
    }

    async fn delete_app_package(&self, package: &AppPackage) -> Result<DeleteOutcome, StoreError> {
        let mut state = self.begin(StoreOperation::DeleteAppPackage)?;
        if let Some(outcome) = state.delete_outcome {
            return Ok(outcome);
        }
        let before = state.packages.len();
        state
            .packages
            .retain(|p| !(p.id == package.id && p.owner_scope == package.owner_scope));
        if state.packages.len() == before {
            return Err(StoreError::NotFound(format!("AppPackages({})", package.id)));
        }
        Ok(DeleteOutcome::Confirmed)
    }

    async fn link_app_package(&self, activity: &Activity, package: &AppPackage) -> Result<(), StoreError> {
        let mut state = self.begin(StoreOperation::LinkAppPackage)?;
        if !state.packages.iter().any(|p| p.id == package.id) {
            return Err(StoreError::NotFound(format!("AppPackages({})", package.id)));
        }
        let stored = state
            .activities
            .iter_mut()
            .find(|a| a.id == activity.id)
            .ok_or_else(|| StoreError::NotFound(format!("Activities({})", activity.id)))?;
        if !stored.linked_package_ids.insert(package.id.clone()) {
            return Err(StoreError::Conflict(format!(
                "{} already references {}",
                activity.id, package.id
            )));
        }
        Ok(())
    }

    async fn create_work_item(&self, work_item: &WorkItem) -> Result<WorkItem, StoreError> {
        let mut state = self.begin(StoreOperation::CreateWorkItem)?;
        if !state
            .activities
            .iter()
            .any(|a| a.id == work_item.activity.id && a.owner_scope == work_item.activity.owner)
        {
            return Err(StoreError::NotFound(format!(
                "Activities({})",
                work_item.activity.id
            )));
        }

        state.next_id += 1;
        let id = format!("wi-{}", state.next_id);
        let mut created = work_item.clone();
        created.id = Some(id.clone());
        created.owner_scope = self.owner();
        created.status = Some("Pending".to_string());

        let script = state.default_status_script.iter().cloned().collect();
        state.status_scripts.insert(id.clone(), script);
        state.work_items.insert(id, created.clone());
        Ok(created)
    }

    async fn get_work_item(&self, _owner: &OwnerScope, id: &str) -> Result<WorkItem, StoreError> {
        let mut state = self.begin(StoreOperation::GetWorkItem)?;

        let next_status = match state.status_scripts.get_mut(id) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };

        let result_base_url = &self.result_base_url;
        let work_item = state
            .work_items
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("WorkItems({})", id)))?;

        if let Some(status) = next_status {
            match status.as_str() {
                "Succeeded" => {
                    for output in work_item.output_arguments.iter_mut() {
                        output.resource = Some(format!("{}/{}/{}", result_base_url, id, output.name));
                    }
                }
                "Failed" => {
                    work_item.status_details = Some(format!("{}/{}/report.txt", result_base_url, id));
                }
                _ => {}
            }
            work_item.status = Some(status);
        }

        Ok(work_item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_item::ActivityRef;

    fn seeded() -> InMemoryResourceStore {
        let store = InMemoryResourceStore::new("client-1");
        let mut shared = Activity::draft("PlotToPDF", "-export result.pdf", "20.0").unwrap();
        shared.owner_scope = OwnerScope::Shared;
        store.insert_activity(shared);
        store
    }

    fn submission() -> WorkItem {
        WorkItem::for_activity(
            ActivityRef {
                owner: OwnerScope::Shared,
                id: "PlotToPDF".to_string(),
            },
            "https://bucket/a.dwg",
        )
    }

    #[tokio::test]
    async fn test_scripted_statuses_advance_per_fetch() {
        let store = seeded();
        store.script_statuses(["Pending", "InProgress", "Succeeded"]);

        let created = store.create_work_item(&submission()).await.unwrap();
        let id = created.id.clone().unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            let wi = store.get_work_item(&created.owner_scope, &id).await.unwrap();
            seen.push(wi.status.clone().unwrap());
        }
        assert_eq!(seen, ["Pending", "InProgress", "Succeeded", "Succeeded"]);
        assert_eq!(store.calls().get_work_item, 4);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let store = seeded();
        store.fail_next(
            StoreOperation::ListActivities,
            StoreError::Transport("connection reset".to_string()),
        );

        assert!(store.list_activities().await.is_err());
        assert_eq!(store.list_activities().await.unwrap().len(), 1);
        assert_eq!(store.calls().list_activities, 2);
    }

    #[tokio::test]
    async fn test_work_item_against_unknown_activity() {
        let store = InMemoryResourceStore::default();
        let result = store.create_work_item(&submission()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_created_resources_are_owned() {
        let store = seeded();
        let draft = Activity::draft("Mine", "_.saveas result.dwg", "20.0").unwrap();

        let created = store.create_activity(&draft).await.unwrap();
        assert_eq!(created.owner_scope, OwnerScope::Owned("client-1".to_string()));
        assert!(matches!(
            store.create_activity(&draft).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
