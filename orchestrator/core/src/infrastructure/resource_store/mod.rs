// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource Store Infrastructure Module
//!
//! Concrete implementations of the ResourceStore trait.

pub mod http;
pub mod memory;

pub use http::HttpResourceStore;
pub use memory::{CallCounts, InMemoryResourceStore, StoreOperation};

use std::sync::Arc;
use std::time::Duration;

use crate::domain::auth::Credential;
use crate::domain::resource_store::{ResourceStore, StoreError};

/// Resource store backend configuration
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// The remote CAD IO resource API (production)
    Http { base_url: String, timeout: Duration },

    /// Process-local store (offline runs and tests)
    InMemory { owner: String },
}

/// Factory function to create a resource store bound to `credential`
pub fn create_resource_store(
    backend: StoreBackend,
    credential: Arc<Credential>,
) -> Result<Arc<dyn ResourceStore>, StoreError> {
    match backend {
        StoreBackend::Http { base_url, timeout } => {
            Ok(Arc::new(HttpResourceStore::new(base_url, credential, timeout)?))
        }
        StoreBackend::InMemory { owner } => Ok(Arc::new(InMemoryResourceStore::new(owner))),
    }
}
