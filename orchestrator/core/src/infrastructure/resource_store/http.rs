// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP Resource Store Adapter
//!
//! Talks to the CAD IO resource API over its OData-style JSON surface.
//! Implements the ResourceStore trait as an Anti-Corruption Layer.
//!
//! # API Endpoints
//!
//! - `GET /Activities`, `GET /AppPackages` - Collections, `{"value": [...]}`
//! - `POST /Activities`, `POST /AppPackages`, `POST /WorkItems` - Create
//! - `PATCH /Activities(UserId='u',Id='i')` - Update script
//! - `DELETE /Activities(UserId='u',Id='i')` - Delete (204 = removed)
//! - `POST /AppPackages/GenerateUploadUrl` - Presigned package upload URL
//! - `POST /Activities(UserId='u',Id='i')/$links/AppPackages` - Link a package
//! - `GET /WorkItems(UserId='u',Id='i')` - Poll a work item

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::activity::{Activity, OwnerScope, Parameter};
use crate::domain::app_package::AppPackage;
use crate::domain::auth::Credential;
use crate::domain::resource_store::{DeleteOutcome, ResourceStore, StoreError};
use crate::domain::work_item::{ActivityRef, Argument, HttpVerb, WorkItem};

pub struct HttpResourceStore {
    client: Client,

    /// Resource API base URL (e.g., "https://developer.api.autodesk.com/autocad.io/v1/")
    base_url: String,

    credential: Arc<Credential>,
}

impl HttpResourceStore {
    pub fn new(
        base_url: impl Into<String>,
        credential: Arc<Credential>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credential,
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_collection<T: for<'de> Deserialize<'de>>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let request = self.client.get(self.build_url(collection));
        let response = self.credential.attach(request).send().await?;
        let response = check_status(response, collection).await?;
        let envelope: Collection<T> = response.json().await?;
        debug!(collection, count = envelope.value.len(), "Fetched collection");
        Ok(envelope.value)
    }

    async fn delete_entity(&self, path: &str) -> Result<DeleteOutcome, StoreError> {
        let request = self.client.delete(self.build_url(path));
        let response = self.credential.attach(request).send().await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(DeleteOutcome::Confirmed),
            status if status.is_success() || status.is_redirection() => {
                Ok(DeleteOutcome::Unconfirmed(status.as_u16()))
            }
            _ => check_status(response, path).await.map(|r| DeleteOutcome::Unconfirmed(r.status().as_u16())),
        }
    }
}

/// OData entity key, e.g. `Activities(UserId='abc',Id='PlotToPdf')`
fn entity_path(collection: &str, owner: &OwnerScope, id: &str) -> String {
    format!(
        "{}(UserId='{}',Id='{}')",
        collection,
        escape_key(owner.tag()),
        escape_key(id)
    )
}

fn escape_key(value: &str) -> String {
    value.replace('\'', "''")
}

/// Map non-success responses onto store errors
async fn check_status(response: Response, what: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| format!("HTTP {}", status));

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Unauthorized(format!("{}: {}", what, body))
        }
        StatusCode::NOT_FOUND => StoreError::NotFound(what.to_string()),
        StatusCode::CONFLICT => StoreError::Conflict(format!("{}: {}", what, body)),
        status => StoreError::Rejected {
            status: status.as_u16(),
            message: body,
        },
    })
}

#[async_trait]
impl ResourceStore for HttpResourceStore {
    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError> {
        let dtos: Vec<ActivityDto> = self.fetch_collection("Activities").await?;
        Ok(dtos.into_iter().map(Activity::from).collect())
    }

    async fn create_activity(&self, activity: &Activity) -> Result<Activity, StoreError> {
        let request = self
            .client
            .post(self.build_url("Activities"))
            .json(&ActivityDto::from(activity));
        let response = self.credential.attach(request).send().await?;
        let response = check_status(response, "Activities").await?;
        let created: ActivityDto = response.json().await?;
        Ok(created.into())
    }

    async fn patch_activity_script(&self, activity: &Activity, script: &str) -> Result<(), StoreError> {
        let path = entity_path("Activities", &activity.owner_scope, &activity.id);
        let body = ScriptPatch {
            instruction: InstructionDto {
                script: script.to_string(),
            },
        };
        let request = self.client.patch(self.build_url(&path)).json(&body);
        let response = self.credential.attach(request).send().await?;
        check_status(response, &path).await?;
        Ok(())
    }

    async fn delete_activity(&self, activity: &Activity) -> Result<DeleteOutcome, StoreError> {
        self.delete_entity(&entity_path("Activities", &activity.owner_scope, &activity.id))
            .await
    }

    async fn list_app_packages(&self) -> Result<Vec<AppPackage>, StoreError> {
        let dtos: Vec<AppPackageDto> = self.fetch_collection("AppPackages").await?;
        Ok(dtos.into_iter().map(AppPackage::from).collect())
    }

    async fn generate_upload_url(&self) -> Result<String, StoreError> {
        let request = self
            .client
            .post(self.build_url("AppPackages/GenerateUploadUrl"))
            .json(&serde_json::json!({}));
        let response = self.credential.attach(request).send().await?;
        let response = check_status(response, "AppPackages/GenerateUploadUrl").await?;
        let value: ValueEnvelope = response.json().await?;
        Ok(value.value)
    }

    async fn create_app_package(&self, package: &AppPackage) -> Result<AppPackage, StoreError> {
        let request = self
            .client
            .post(self.build_url("AppPackages"))
            .json(&AppPackageDto::from(package));
        let response = self.credential.attach(request).send().await?;
        let response = check_status(response, "AppPackages").await?;
        let created: AppPackageDto = response.json().await?;
        Ok(created.into())
    }

    async fn delete_app_package(&self, package: &AppPackage) -> Result<DeleteOutcome, StoreError> {
        self.delete_entity(&entity_path("AppPackages", &package.owner_scope, &package.id))
            .await
    }

    async fn link_app_package(&self, activity: &Activity, package: &AppPackage) -> Result<(), StoreError> {
        let path = format!(
            "{}/$links/AppPackages",
            entity_path("Activities", &activity.owner_scope, &activity.id)
        );
        let target = self.build_url(&entity_path("AppPackages", &package.owner_scope, &package.id));
        let request = self
            .client
            .post(self.build_url(&path))
            .json(&serde_json::json!({ "url": target }));
        let response = self.credential.attach(request).send().await?;
        check_status(response, &path).await?;
        Ok(())
    }

    async fn create_work_item(&self, work_item: &WorkItem) -> Result<WorkItem, StoreError> {
        let request = self
            .client
            .post(self.build_url("WorkItems"))
            .json(&WorkItemDto::from(work_item));
        let response = self.credential.attach(request).send().await?;
        let response = check_status(response, "WorkItems").await?;
        let created: WorkItemDto = response.json().await?;
        created.try_into()
    }

    async fn get_work_item(&self, owner: &OwnerScope, id: &str) -> Result<WorkItem, StoreError> {
        let path = entity_path("WorkItems", owner, id);
        let request = self.client.get(self.build_url(&path));
        let response = self.credential.attach(request).send().await?;
        let response = check_status(response, &path).await?;
        let dto: WorkItemDto = response.json().await?;
        dto.try_into()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
struct ValueEnvelope {
    value: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstructionDto {
    script: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ScriptPatch {
    instruction: InstructionDto,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterDto {
    name: String,
    local_file_name: String,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ParametersDto {
    #[serde(default)]
    input_parameters: Vec<ParameterDto>,
    #[serde(default)]
    output_parameters: Vec<ParameterDto>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ActivityDto {
    #[serde(default)]
    user_id: String,
    id: String,
    #[serde(default)]
    version: u32,
    instruction: InstructionDto,
    #[serde(default)]
    parameters: ParametersDto,
    #[serde(default)]
    required_engine_version: String,
    #[serde(default)]
    app_packages: Vec<String>,
}

fn parameters_from_dto(dtos: Vec<ParameterDto>) -> Vec<Parameter> {
    dtos.into_iter()
        .map(|p| Parameter::new(p.name, p.local_file_name))
        .collect()
}

fn parameters_to_dto(params: &[Parameter]) -> Vec<ParameterDto> {
    params
        .iter()
        .map(|p| ParameterDto {
            name: p.name.clone(),
            local_file_name: p.local_file_name.clone(),
        })
        .collect()
}

impl From<ActivityDto> for Activity {
    fn from(dto: ActivityDto) -> Self {
        Self {
            id: dto.id,
            owner_scope: OwnerScope::from_tag(&dto.user_id),
            version: dto.version,
            script: dto.instruction.script,
            required_engine_version: dto.required_engine_version,
            input_parameters: parameters_from_dto(dto.parameters.input_parameters),
            output_parameters: parameters_from_dto(dto.parameters.output_parameters),
            linked_package_ids: dto.app_packages.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

impl From<&Activity> for ActivityDto {
    fn from(activity: &Activity) -> Self {
        Self {
            user_id: activity.owner_scope.tag().to_string(),
            id: activity.id.clone(),
            version: activity.version,
            instruction: InstructionDto {
                script: activity.script.clone(),
            },
            parameters: ParametersDto {
                input_parameters: parameters_to_dto(&activity.input_parameters),
                output_parameters: parameters_to_dto(&activity.output_parameters),
            },
            required_engine_version: activity.required_engine_version.clone(),
            app_packages: activity.linked_package_ids.iter().cloned().collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AppPackageDto {
    #[serde(default)]
    user_id: String,
    id: String,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    required_engine_version: String,
    resource: String,
}

impl From<AppPackageDto> for AppPackage {
    fn from(dto: AppPackageDto) -> Self {
        Self {
            id: dto.id,
            owner_scope: OwnerScope::from_tag(&dto.user_id),
            version: dto.version,
            required_engine_version: dto.required_engine_version,
            resource: dto.resource,
        }
    }
}

impl From<&AppPackage> for AppPackageDto {
    fn from(package: &AppPackage) -> Self {
        Self {
            user_id: package.owner_scope.tag().to_string(),
            id: package.id.clone(),
            version: package.version,
            required_engine_version: package.required_engine_version.clone(),
            resource: package.resource.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntityIdDto {
    user_id: String,
    id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArgumentDto {
    name: String,
    resource: Option<String>,
    storage_provider: String,
    http_verb: String,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ArgumentsDto {
    #[serde(default)]
    input_arguments: Vec<ArgumentDto>,
    #[serde(default)]
    output_arguments: Vec<ArgumentDto>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WorkItemDto {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    version: u32,
    activity_id: EntityIdDto,
    #[serde(default)]
    arguments: ArgumentsDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_details: Option<serde_json::Value>,
}

fn verb_from_wire(verb: &str) -> Result<HttpVerb, StoreError> {
    match verb.to_ascii_uppercase().as_str() {
        "GET" => Ok(HttpVerb::Get),
        "POST" => Ok(HttpVerb::Post),
        "PUT" => Ok(HttpVerb::Put),
        other => Err(StoreError::Serialization(format!(
            "unsupported argument HttpVerb '{}'",
            other
        ))),
    }
}

fn arguments_from_dto(dtos: Vec<ArgumentDto>) -> Result<Vec<Argument>, StoreError> {
    dtos.into_iter()
        .map(|a| {
            Ok(Argument {
                http_verb: verb_from_wire(&a.http_verb)?,
                name: a.name,
                resource: a.resource.filter(|r| !r.is_empty()),
                storage_provider: a.storage_provider,
            })
        })
        .collect()
}

fn arguments_to_dto(args: &[Argument]) -> Vec<ArgumentDto> {
    args.iter()
        .map(|a| ArgumentDto {
            name: a.name.clone(),
            resource: a.resource.clone(),
            storage_provider: a.storage_provider.clone(),
            http_verb: a.http_verb.as_str().to_string(),
        })
        .collect()
}

/// The store reports failure details either as plain text or as an object
/// carrying a `Report` field
fn status_details_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(ref map) => match map.get("Report") {
            Some(serde_json::Value::String(report)) => Some(report.clone()),
            _ => Some(value.to_string()),
        },
        other => Some(other.to_string()),
    }
}

impl TryFrom<WorkItemDto> for WorkItem {
    type Error = StoreError;

    fn try_from(dto: WorkItemDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(dto.id).filter(|id| !id.is_empty()),
            owner_scope: OwnerScope::from_tag(&dto.user_id),
            activity: ActivityRef {
                owner: OwnerScope::from_tag(&dto.activity_id.user_id),
                id: dto.activity_id.id,
            },
            input_arguments: arguments_from_dto(dto.arguments.input_arguments)?,
            output_arguments: arguments_from_dto(dto.arguments.output_arguments)?,
            status: dto.status,
            status_details: dto.status_details.and_then(status_details_text),
        })
    }
}

impl From<&WorkItem> for WorkItemDto {
    fn from(work_item: &WorkItem) -> Self {
        Self {
            user_id: work_item.owner_scope.tag().to_string(),
            id: work_item.id.clone().unwrap_or_default(),
            version: 1,
            activity_id: EntityIdDto {
                user_id: work_item.activity.owner.tag().to_string(),
                id: work_item.activity.id.clone(),
            },
            arguments: ArgumentsDto {
                input_arguments: arguments_to_dto(&work_item.input_arguments),
                output_arguments: arguments_to_dto(&work_item.output_arguments),
            },
            status: None,
            status_details: None,
        }
    }
}
