// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! CAD IO orchestration core
//!
//! Registers activities and app packages with the CAD IO compute service,
//! submits work items against them and follows each one to its result.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root; re-exports the domain model

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{JobOrchestrator, PollSettings, ResourceCatalog, Session, SessionBuilder};
pub use domain::*;
