//! Integration tests for the Egide JWT server.
//!
//! Each test starts the server in-process on an ephemeral port and talks to
//! it over HTTP.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use egide_jwt_server::{router, AppState, ServerConfig};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Shared secret used by [`TestServer::start_default`].
pub const TEST_SECRET: &str = "integration-secret-minimum-32-chars!";

/// Issuer expected by [`TestServer::start_default`].
pub const TEST_ISSUER: &str = "https://api.nubster.com";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub strategy: String,
}

#[derive(Debug, Deserialize)]
pub struct WhoAmIResponse {
    pub sub: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ============================================================================
// Test Server
// ============================================================================

/// A server instance with its own configuration directory.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    task: JoinHandle<()>,
    _config_dir: TempDir,
}

impl TestServer {
    /// Writes `config` to a temp file, loads it and serves it on an ephemeral port.
    pub async fn start(config: &str) -> Result<Self> {
        let config_dir = TempDir::new().context("Failed to create temp dir")?;
        let path = config_dir.path().join("egide-jwt.toml");
        std::fs::write(&path, config).context("Failed to write config")?;

        let config = ServerConfig::load(&path).context("Failed to load config")?;
        let state = AppState::from_config(config).context("Invalid strategy configuration")?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind")?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            addr,
            task,
            _config_dir: config_dir,
        })
    }

    /// Server with bearer, query and form extractors and two accounts.
    pub async fn start_default() -> Result<Self> {
        Self::start(&default_config()).await
    }

    /// Get a configured HTTP client for this server.
    pub fn client(&self) -> EgideJwtClient {
        EgideJwtClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Configuration used by [`TestServer::start_default`].
pub fn default_config() -> String {
    format!(
        r#"
        [strategy]
        secret = "{TEST_SECRET}"
        issuer = "{TEST_ISSUER}"
        audience = ["egide"]

        [[strategy.extractors]]
        from = "bearer"

        [[strategy.extractors]]
        from = "query"
        param = "access_token"

        [[strategy.extractors]]
        from = "body_field"
        field = "access_token"

        [[directory.accounts]]
        sub = "account-12345"
        name = "Alice"

        [[directory.accounts]]
        sub = "account-revoked"
        name = "Mallory"
        revoked = true
        "#
    )
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Signs `claims` with `secret` (HS256).
pub fn sign(claims: &Value, secret: &str) -> Result<String> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Token accepted by the default server for `sub`.
pub fn token_for(sub: &str) -> Result<String> {
    sign(
        &serde_json::json!({
            "sub": sub,
            "iss": TEST_ISSUER,
            "aud": "egide",
            "exp": now() + 3600,
        }),
        TEST_SECRET,
    )
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the Egide JWT API.
pub struct EgideJwtClient {
    client: Client,
    base_url: String,
}

impl EgideJwtClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/v1/sys/health")).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn whoami_bearer(&self, token: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url("/v1/auth/whoami"))
            .bearer_auth(token)
            .send()
            .await?)
    }

    pub async fn whoami_authorization(&self, header: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url("/v1/auth/whoami"))
            .header("Authorization", header)
            .send()
            .await?)
    }

    pub async fn whoami_query(&self, token: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url("/v1/auth/whoami"))
            .query(&[("access_token", token)])
            .send()
            .await?)
    }

    pub async fn whoami_form(&self, token: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url("/v1/auth/whoami"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("access_token={token}"))
            .send()
            .await?)
    }

    pub async fn whoami_json(&self, body: &Value) -> Result<Response> {
        Ok(self
            .client
            .post(self.url("/v1/auth/whoami"))
            .json(body)
            .send()
            .await?)
    }

    pub async fn whoami_anonymous(&self) -> Result<Response> {
        Ok(self.client.get(self.url("/v1/auth/whoami")).send().await?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    async fn expect_unauthorized(resp: Response) -> ErrorResponse {
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
        resp.json().await.unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::start_default().await.unwrap();
        let health = server.client().health().await.unwrap();

        assert_eq!(health.status, "ok");
        assert_eq!(health.strategy, "jwt");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_bearer_token_authenticates() {
        let server = TestServer::start_default().await.unwrap();
        let token = token_for("account-12345").unwrap();

        let resp = server.client().whoami_bearer(&token).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let me: WhoAmIResponse = resp.json().await.unwrap();
        assert_eq!(me.sub, "account-12345");
        assert_eq!(me.name, "Alice");
    }

    #[tokio::test]
    async fn test_scheme_is_case_insensitive() {
        let server = TestServer::start_default().await.unwrap();
        let token = token_for("account-12345").unwrap();

        let resp = server
            .client()
            .whoami_authorization(&format!("bEaReR {token}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = server
            .client()
            .whoami_authorization(&format!("Basic {token}"))
            .await
            .unwrap();
        let error = expect_unauthorized(resp).await;
        assert_eq!(error.message, "no auth token");
    }

    #[tokio::test]
    async fn test_missing_token_is_challenged() {
        let server = TestServer::start_default().await.unwrap();

        let resp = server.client().whoami_anonymous().await.unwrap();
        let error = expect_unauthorized(resp).await;
        assert_eq!(error.error, "unauthorized");
        assert_eq!(error.message, "no auth token");
    }

    #[tokio::test]
    async fn test_query_and_form_tokens() {
        let server = TestServer::start_default().await.unwrap();
        let client = server.client();
        let token = token_for("account-12345").unwrap();

        let resp = client.whoami_query(&token).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = client.whoami_form(&token).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = client
            .whoami_json(&json!({ "access_token": token }))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = client
            .whoami_json(&json!({ "access_token": 42 }))
            .await
            .unwrap();
        expect_unauthorized(resp).await;
    }

    #[tokio::test]
    async fn test_revoked_account() {
        let server = TestServer::start_default().await.unwrap();
        let token = token_for("account-revoked").unwrap();

        let resp = server.client().whoami_bearer(&token).await.unwrap();
        let error = expect_unauthorized(resp).await;
        assert_eq!(error.message, "user revoked");
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let server = TestServer::start_default().await.unwrap();
        let token = token_for("account-unknown").unwrap();

        let resp = server.client().whoami_bearer(&token).await.unwrap();
        let error = expect_unauthorized(resp).await;
        assert_eq!(error.message, "unknown user");
    }

    #[tokio::test]
    async fn test_rejected_tokens() {
        let server = TestServer::start_default().await.unwrap();
        let client = server.client();

        let wrong_secret = sign(
            &json!({ "sub": "account-12345", "iss": TEST_ISSUER, "aud": "egide" }),
            "some-other-secret-minimum-32-chars!",
        )
        .unwrap();
        expect_unauthorized(client.whoami_bearer(&wrong_secret).await.unwrap()).await;

        let expired = sign(
            &json!({
                "sub": "account-12345",
                "iss": TEST_ISSUER,
                "aud": "egide",
                "exp": now() - 3600,
            }),
            TEST_SECRET,
        )
        .unwrap();
        expect_unauthorized(client.whoami_bearer(&expired).await.unwrap()).await;

        let wrong_issuer = sign(
            &json!({ "sub": "account-12345", "iss": "https://malicious.com", "aud": "egide" }),
            TEST_SECRET,
        )
        .unwrap();
        expect_unauthorized(client.whoami_bearer(&wrong_issuer).await.unwrap()).await;

        let wrong_audience = sign(
            &json!({ "sub": "account-12345", "iss": TEST_ISSUER, "aud": "billing" }),
            TEST_SECRET,
        )
        .unwrap();
        expect_unauthorized(client.whoami_bearer(&wrong_audience).await.unwrap()).await;
    }

    #[tokio::test]
    async fn test_key_table_config() {
        let server = TestServer::start(
            r#"
            [strategy]
            default_key = "primary"

            [strategy.keys.primary]
            secret = "primary-secret-minimum-32-chars!!"

            [strategy.keys.rotated]
            secret = "rotated-secret-minimum-32-chars!!"

            [[directory.accounts]]
            sub = "account-12345"
            name = "Alice"
            "#,
        )
        .await
        .unwrap();
        let client = server.client();

        let mut header = Header::default();
        header.kid = Some("rotated".to_string());
        let rotated = encode(
            &header,
            &json!({ "sub": "account-12345" }),
            &EncodingKey::from_secret(b"rotated-secret-minimum-32-chars!!"),
        )
        .unwrap();
        let resp = client.whoami_bearer(&rotated).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let primary = sign(&json!({ "sub": "account-12345" }), "primary-secret-minimum-32-chars!!")
            .unwrap();
        let resp = client.whoami_bearer(&primary).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_config_is_refused() {
        let result = TestServer::start(
            r#"
            [strategy]
            secret = "a"
            public_key_pem = "not a key"
            "#,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let server = TestServer::start_default().await.unwrap();
        let base_url = server.base_url.clone();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let client = EgideJwtClient::new(&base_url);
                tokio::spawn(async move {
                    let sub = if i % 2 == 0 { "account-12345" } else { "account-revoked" };
                    let token = token_for(sub).unwrap();
                    let resp = client.whoami_bearer(&token).await.unwrap();
                    (i, resp.status())
                })
            })
            .collect();

        for handle in handles {
            let (i, status) = handle.await.unwrap();
            let expected = if i % 2 == 0 {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            };
            assert_eq!(status, expected, "request {i}");
        }
    }
}
