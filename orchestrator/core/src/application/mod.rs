// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod job_orchestrator;
pub mod resource_catalog;
pub mod session;

pub use job_orchestrator::{JobOrchestrator, PollSettings};
pub use resource_catalog::ResourceCatalog;
pub use session::{Session, SessionBuilder};
