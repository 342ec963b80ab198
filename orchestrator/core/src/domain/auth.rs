// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Authentication contract
//!
//! A `Credential` is acquired once per session and is read-only afterwards,
//! so it can be shared across concurrent calls behind an `Arc`.

use async_trait::async_trait;

use crate::domain::error::OrchestrationError;

/// Bearer credential attached to every resource store request
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token_type: String,
    access_token: String,
}

impl Credential {
    pub fn new(
        token_type: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, OrchestrationError> {
        let token_type = token_type.into();
        let access_token = access_token.into();
        if token_type.trim().is_empty() || access_token.trim().is_empty() {
            return Err(OrchestrationError::AuthFailed(
                "token response did not contain a usable access token".to_string(),
            ));
        }
        Ok(Self {
            token_type,
            access_token,
        })
    }

    /// Value of the `Authorization` header, e.g. `Bearer abc123`
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Inject the credential into an outbound request.
    pub fn attach(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, self.authorization_header())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Exchanges client credentials for a bearer `Credential`
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Credential, OrchestrationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_header() {
        let credential = Credential::new("Bearer", "abc123").unwrap();
        assert_eq!(credential.authorization_header(), "Bearer abc123");
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            Credential::new("Bearer", ""),
            Err(OrchestrationError::AuthFailed(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("Bearer", "secret-token").unwrap();
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
