// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP Transfer Gateway
//!
//! Moves whole files to and from presigned URLs. Uploads are a single `PUT`
//! of the file body; downloads are a `GET` written to the destination path.
//! No credential is attached since the URLs carry their own authorization.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::domain::transfer::{TransferError, TransferGateway};

pub struct HttpTransferGateway {
    client: Client,
}

impl HttpTransferGateway {
    pub fn new(timeout: Duration) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TransferGateway for HttpTransferGateway {
    async fn upload(&self, url: &str, local_path: &Path) -> Result<(), TransferError> {
        let body = tokio::fs::read(local_path).await?;
        let size = body.len();

        let response = self.client.put(url).body(body).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                debug!(url, size, "Uploaded {:?}", local_path);
                Ok(())
            }
            status => Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<(), TransferError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &bytes).await?;
        debug!(url, size = bytes.len(), "Downloaded to {:?}", destination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_upload_puts_file_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/pkg")
            .match_query(Matcher::UrlEncoded("sig".into(), "abc".into()))
            .match_body("zip-bytes")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        std::fs::write(&archive, "zip-bytes").unwrap();

        let gateway = HttpTransferGateway::new(Duration::from_secs(5)).unwrap();
        gateway
            .upload(&format!("{}/pkg?sig=abc", server.url()), &archive)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_rejection_reports_status() {
        let mut server = Server::new_async().await;
        let _mock = server.mock("PUT", "/pkg").with_status(403).create_async().await;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        std::fs::write(&archive, "zip-bytes").unwrap();

        let gateway = HttpTransferGateway::new(Duration::from_secs(5)).unwrap();
        let result = gateway.upload(&format!("{}/pkg", server.url()), &archive).await;
        assert!(matches!(result, Err(TransferError::Status { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_io_error() {
        let gateway = HttpTransferGateway::new(Duration::from_secs(5)).unwrap();
        let result = gateway
            .upload("http://127.0.0.1:9/unused", Path::new("/nonexistent/bundle.zip"))
            .await;
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[tokio::test]
    async fn test_download_writes_destination() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/results/result.pdf")
            .with_status(200)
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out").join("result.pdf");

        let gateway = HttpTransferGateway::new(Duration::from_secs(5)).unwrap();
        gateway
            .download(&format!("{}/results/result.pdf", server.url()), &destination)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "%PDF-1.4");
    }
}
