// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session
//!
//! Owns the authenticated credential and the adapters built around it. A
//! `ResourceCatalog` or `JobOrchestrator` can only be obtained from a
//! session, so nothing talks to the store before authentication succeeded.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root for catalog and orchestrator

use std::sync::Arc;
use tracing::info;

use crate::application::job_orchestrator::{JobOrchestrator, PollSettings};
use crate::application::resource_catalog::ResourceCatalog;
use crate::domain::auth::{Authenticator, Credential};
use crate::domain::client_config::ClientConfig;
use crate::domain::error::OrchestrationError;
use crate::domain::resource_store::ResourceStore;
use crate::domain::transfer::TransferGateway;
use crate::infrastructure::auth::HttpAuthenticator;
use crate::infrastructure::bundle_inspector::BundleInspector;
use crate::infrastructure::resource_store::{create_resource_store, StoreBackend};
use crate::infrastructure::transfer::HttpTransferGateway;

#[derive(Clone)]
pub struct Session {
    config: ClientConfig,
    credential: Arc<Credential>,
    store: Arc<dyn ResourceStore>,
    transfer: Arc<dyn TransferGateway>,
    inspector: Arc<BundleInspector>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_base_url", &self.config.api_base_url)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Authenticate with the configured client credentials and connect to
    /// the resource API over HTTP.
    pub async fn connect(config: ClientConfig) -> Result<Self, OrchestrationError> {
        config
            .validate()
            .map_err(|e| OrchestrationError::Config(e.to_string()))?;
        let authenticator = HttpAuthenticator::new(config.auth_url.as_str(), config.http_timeout)?;
        Self::connect_with(config, &authenticator).await
    }

    /// Like `connect`, with a caller-supplied authenticator.
    pub async fn connect_with(
        config: ClientConfig,
        authenticator: &dyn Authenticator,
    ) -> Result<Self, OrchestrationError> {
        let client_id = config
            .resolved_client_id()
            .map_err(|e| OrchestrationError::Config(e.to_string()))?;
        let client_secret = config
            .resolved_client_secret()
            .map_err(|e| OrchestrationError::Config(e.to_string()))?;

        let credential = Arc::new(authenticator.authenticate(&client_id, &client_secret).await?);
        info!(api_base_url = %config.api_base_url, "Authenticated client session");

        let store = create_resource_store(
            StoreBackend::Http {
                base_url: config.api_base_url.clone(),
                timeout: config.http_timeout,
            },
            credential.clone(),
        )?;

        SessionBuilder::new()
            .with_config(config)
            .with_credential(credential)
            .with_store(store)
            .build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn inspector(&self) -> &BundleInspector {
        &self.inspector
    }

    pub fn catalog(&self) -> ResourceCatalog {
        ResourceCatalog::new(
            self.store.clone(),
            self.transfer.clone(),
            self.inspector.clone(),
            self.config.required_engine_version.as_str(),
        )
    }

    pub fn orchestrator(&self) -> JobOrchestrator {
        JobOrchestrator::new(
            self.catalog(),
            self.store.clone(),
            self.transfer.clone(),
            PollSettings {
                interval: self.config.poll_interval,
                timeout: self.config.poll_timeout,
            },
        )
    }
}

/// Builder for `Session` from individual parts.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::builder()
///     .with_credential(Arc::new(Credential::new("Bearer", token)?))
///     .with_store(Arc::new(InMemoryResourceStore::default()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<ClientConfig>,
    credential: Option<Arc<Credential>>,
    store: Option<Arc<dyn ResourceStore>>,
    transfer: Option<Arc<dyn TransferGateway>>,
    inspector: Option<BundleInspector>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_credential(mut self, credential: Arc<Credential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_transfer(mut self, transfer: Arc<dyn TransferGateway>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn with_inspector(mut self, inspector: BundleInspector) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Fails with `NotInitialized` unless a credential and a store were given.
    pub fn build(self) -> Result<Session, OrchestrationError> {
        let credential = self.credential.ok_or_else(|| {
            OrchestrationError::NotInitialized("no credential; authenticate first".to_string())
        })?;
        let store = self.store.ok_or_else(|| {
            OrchestrationError::NotInitialized("no resource store configured".to_string())
        })?;
        let config = self.config.unwrap_or_default();

        let transfer: Arc<dyn TransferGateway> = match self.transfer {
            Some(transfer) => transfer,
            None => Arc::new(
                HttpTransferGateway::new(config.http_timeout)
                    .map_err(|e| OrchestrationError::TransportError(e.to_string()))?,
            ),
        };
        let inspector = self
            .inspector
            .unwrap_or_else(|| BundleInspector::new(config.scratch_dir()));

        Ok(Session {
            config,
            credential,
            store,
            transfer,
            inspector: Arc::new(inspector),
        })
    }
}
