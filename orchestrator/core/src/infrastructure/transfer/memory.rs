// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::transfer::{TransferError, TransferGateway};

/// Keeps uploaded blobs in memory and serves downloads from the same map.
#[derive(Default)]
pub struct InMemoryTransferGateway {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    rejected_status: Mutex<Option<u16>>,
    uploads: Mutex<usize>,
}

impl InMemoryTransferGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `url` downloadable with `content`.
    pub fn put_blob(&self, url: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.blobs.lock().insert(url.into(), content.into());
    }

    pub fn blob(&self, url: &str) -> Option<Vec<u8>> {
        self.blobs.lock().get(url).cloned()
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock()
    }

    /// Answer the next transfer with an HTTP failure.
    pub fn reject_next(&self, status: u16) {
        *self.rejected_status.lock() = Some(status);
    }

    fn take_rejection(&self, url: &str) -> Result<(), TransferError> {
        match self.rejected_status.lock().take() {
            Some(status) => Err(TransferError::Status {
                url: url.to_string(),
                status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TransferGateway for InMemoryTransferGateway {
    async fn upload(&self, url: &str, local_path: &Path) -> Result<(), TransferError> {
        *self.uploads.lock() += 1;
        self.take_rejection(url)?;
        let content = tokio::fs::read(local_path).await?;
        self.blobs.lock().insert(url.to_string(), content);
        Ok(())
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<(), TransferError> {
        self.take_rejection(url)?;
        let content = self.blob(url).ok_or_else(|| TransferError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        tokio::fs::write(destination, content).await?;
        Ok(())
    }
}
