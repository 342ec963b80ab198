// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client credentials authenticator
//!
//! Posts `client_id`, `client_secret` and `grant_type=client_credentials`
//! as a form to the token endpoint and turns the JSON answer into a
//! `Credential`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::auth::{Authenticator, Credential};
use crate::domain::error::OrchestrationError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct HttpAuthenticator {
    client: Client,
    auth_url: String,
}

impl HttpAuthenticator {
    pub fn new(auth_url: impl Into<String>, timeout: Duration) -> Result<Self, OrchestrationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrchestrationError::TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_url: auth_url.into(),
        })
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Credential, OrchestrationError> {
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(OrchestrationError::AuthFailed(
                "client id and secret are required".to_string(),
            ));
        }

        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| OrchestrationError::TransportError(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token endpoint rejected client credentials");
            return Err(OrchestrationError::AuthFailed(format!(
                "token endpoint returned HTTP {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OrchestrationError::AuthFailed(format!("malformed token response: {}", e)))?;

        debug!(expires_in = ?token.expires_in, "Acquired access token");
        Credential::new(token.token_type, token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_authenticate_posts_client_credentials_form() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/authenticate")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "my-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "my-secret".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer","access_token":"tok-1","expires_in":1799}"#)
            .create_async()
            .await;

        let auth = HttpAuthenticator::new(format!("{}/authenticate", server.url()), Duration::from_secs(5)).unwrap();
        let credential = auth.authenticate("my-id", "my-secret").await.unwrap();

        mock.assert_async().await;
        assert_eq!(credential.authorization_header(), "Bearer tok-1");
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/authenticate")
            .with_status(401)
            .with_body(r#"{"developerMessage":"invalid client"}"#)
            .create_async()
            .await;

        let auth = HttpAuthenticator::new(format!("{}/authenticate", server.url()), Duration::from_secs(5)).unwrap();
        let result = auth.authenticate("my-id", "wrong").await;
        assert!(matches!(result, Err(OrchestrationError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_token_is_auth_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/authenticate")
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer","access_token":""}"#)
            .create_async()
            .await;

        let auth = HttpAuthenticator::new(format!("{}/authenticate", server.url()), Duration::from_secs(5)).unwrap();
        let result = auth.authenticate("my-id", "my-secret").await;
        assert!(matches!(result, Err(OrchestrationError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_client_secret_short_circuits() {
        let auth = HttpAuthenticator::new("http://127.0.0.1:9/authenticate", Duration::from_secs(1)).unwrap();
        let result = auth.authenticate("my-id", "").await;
        assert!(matches!(result, Err(OrchestrationError::AuthFailed(_))));
    }
}
