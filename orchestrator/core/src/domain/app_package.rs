// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

use crate::domain::activity::OwnerScope;

/// A versioned extension bundle an activity may load before running its script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPackage {
    pub id: String,
    pub owner_scope: OwnerScope,
    pub version: u32,
    pub required_engine_version: String,
    /// URL of the uploaded bundle archive
    pub resource: String,
}

impl AppPackage {
    pub fn draft(
        id: impl Into<String>,
        resource: impl Into<String>,
        required_engine_version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_scope: OwnerScope::default(),
            version: 1,
            required_engine_version: required_engine_version.into(),
            resource: resource.into(),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.owner_scope.is_shared()
    }
}
