// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod auth;
pub mod bundle_inspector;
pub mod resource_store;
pub mod telemetry;
pub mod transfer;

pub use auth::HttpAuthenticator;
pub use bundle_inspector::BundleInspector;
pub use resource_store::{create_resource_store, InMemoryResourceStore, StoreBackend};
pub use transfer::{HttpTransferGateway, InMemoryTransferGateway};
