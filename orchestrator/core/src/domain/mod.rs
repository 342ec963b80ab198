// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model
//!
//! Entities, value objects and the ports the infrastructure layer implements.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Activities, app packages, work items and their contracts

pub mod activity;
pub mod app_package;
pub mod auth;
pub mod bundle;
pub mod client_config;
pub mod error;
pub mod resource_store;
pub mod transfer;
pub mod work_item;

pub use activity::{Activity, OwnerScope, Parameter};
pub use app_package::AppPackage;
pub use auth::{Authenticator, Credential};
pub use bundle::{BundleCommands, BundleHandle, BundleLayout};
pub use client_config::ClientConfig;
pub use error::{OrchestrationError, ResourceKind};
pub use resource_store::{DeleteOutcome, ResourceStore, StoreError};
pub use transfer::{TransferError, TransferGateway};
pub use work_item::{ActivityRef, Argument, HttpVerb, WorkItem, WorkItemStatus};
