// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transfer Gateway Trait
//!
//! Whole-file blob transfer to and from arbitrary URLs (presigned object
//! storage links, package upload URLs, work item results). Failures are
//! always reported to the caller and never retried here.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[async_trait]
pub trait TransferGateway: Send + Sync {
    /// Upload the contents of `local_path` to `url`
    async fn upload(&self, url: &str, local_path: &Path) -> Result<(), TransferError>;

    /// Download `url` into `destination`, replacing any existing file
    async fn download(&self, url: &str, destination: &Path) -> Result<(), TransferError>;
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transfer of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        TransferError::Network(err.to_string())
    }
}
