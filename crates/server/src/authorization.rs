use std::time::Duration;

use async_trait::async_trait;
use configs::AuthorizationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// Name of the cookie carrying the caller's access token.
pub const ACCESS_TOKEN_COOKIE: &str = "Access-Token";

/// Identity resolved for a request; `account_id == 0` means anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationData {
    pub account_id: i64,
    #[serde(default)]
    pub two_fa_status: bool,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub message: String,
    pub status_code: u16,
}

impl AuthorizationData {
    pub fn anonymous() -> Self {
        Self { account_id: 0, two_fa_status: false, role: String::new(), message: "Unauthorized".into(), status_code: 200 }
    }
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("authorization service unreachable: {0}")]
    Transport(String),
    #[error("authorization response malformed: {0}")]
    Decode(String),
}

/// Remote identity check for an access token.
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    async fn check_authorization(&self, access_token: &str) -> Result<AuthorizationData, AuthorizationError>;
}

/// Calls `GET {base_url}/check` with the token in the `Access-Token` cookie.
pub struct HttpAuthorizationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthorizationClient {
    pub fn new(cfg: &AuthorizationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self { client, base_url: cfg.base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl AuthorizationClient for HttpAuthorizationClient {
    #[instrument(name = "AuthorizationClient.check_authorization", skip_all, err)]
    async fn check_authorization(&self, access_token: &str) -> Result<AuthorizationData, AuthorizationError> {
        let resp = self
            .client
            .get(format!("{}/check", self.base_url))
            .header(reqwest::header::COOKIE, format!("{ACCESS_TOKEN_COOKIE}={access_token}"))
            .send()
            .await
            .map_err(|e| AuthorizationError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let mut data: AuthorizationData = resp
            .json()
            .await
            .map_err(|e| AuthorizationError::Decode(e.to_string()))?;
        // the transport status wins over whatever the body claims
        if status != 200 {
            data.status_code = status;
        }
        Ok(data)
    }
}

/// Fixed answers, for tests and local runs without the identity service.
pub mod stub {
    use super::*;

    pub struct StubAuthorizationClient {
        pub response: Result<AuthorizationData, String>,
    }

    impl StubAuthorizationClient {
        pub fn allow(account_id: i64) -> Self {
            Self {
                response: Ok(AuthorizationData {
                    account_id,
                    two_fa_status: false,
                    role: "user".into(),
                    message: "ok".into(),
                    status_code: 200,
                }),
            }
        }

        pub fn deny() -> Self {
            Self {
                response: Ok(AuthorizationData {
                    account_id: 0,
                    two_fa_status: false,
                    role: String::new(),
                    message: "token expired".into(),
                    status_code: 403,
                }),
            }
        }

        pub fn unreachable() -> Self {
            Self { response: Err("connection refused".into()) }
        }
    }

    #[async_trait]
    impl AuthorizationClient for StubAuthorizationClient {
        async fn check_authorization(&self, _access_token: &str) -> Result<AuthorizationData, AuthorizationError> {
            self.response.clone().map_err(AuthorizationError::Transport)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_check_response_with_missing_optional_fields() {
        let data: AuthorizationData =
            serde_json::from_value(serde_json::json!({"account_id": 7, "status_code": 200})).unwrap();
        assert_eq!(data.account_id, 7);
        assert!(data.role.is_empty());
        assert!(!data.two_fa_status);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let cfg = AuthorizationConfig { enabled: true, base_url: "http://auth:8081/api/authorization/".into(), timeout_ms: 100 };
        let client = HttpAuthorizationClient::new(&cfg).unwrap();
        assert_eq!(client.base_url, "http://auth:8081/api/authorization");
    }
}
