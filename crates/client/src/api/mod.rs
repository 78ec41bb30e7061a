// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP client for the SkillSwap backend.
//!
//! Credentials are an HTTP-only session cookie; the client never sees a token
//! value, only the cookie jar. On a 401 the client refreshes the session via
//! `POST /token/refresh/` (single-flight, see [`refresh`]) and retries the
//! request once. Any other error status passes through to the caller.

pub mod refresh;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::api::refresh::{RefreshGate, RefreshOutcome};

/// Response of `POST /token/refresh/`. The interesting part — the session
/// cookie — lands in the cookie jar; the body is only validated for shape.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[allow(dead_code)]
    access: String,
    #[serde(default)]
    #[allow(dead_code)]
    user: Value,
}

/// Response of the authentication probe `GET /auth/check/`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Response of the user-scoped notification handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEndpoint {
    pub websocket_url: String,
}

/// HTTP client wrapper for one backend, with single-flight session refresh.
pub struct ApiClient {
    config: ClientConfig,
    client: reqwest::Client,
    gate: RefreshGate,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Self { config, client, gate: RefreshGate::new() }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// GET a JSON endpoint.
    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.request_json(Method::GET, path, None).await
    }

    /// POST JSON to an endpoint and return the response body.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    /// DELETE an endpoint.
    pub async fn delete_json(&self, path: &str) -> Result<Value, ApiError> {
        self.request_json(Method::DELETE, path, None).await
    }

    /// `GET /auth/check/` — probe whether the session is authenticated.
    pub async fn auth_check(&self) -> Result<AuthStatus, ApiError> {
        let value = self.get_json("/auth/check/").await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Notification handshake: resolve the push-channel URL for a user.
    pub async fn notification_endpoint(&self, user_id: i64) -> Result<ChannelEndpoint, ApiError> {
        let value = self.get_json(&format!("/notifications/endpoint/?user={user_id}")).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Perform a request, masking a transient session expiry.
    ///
    /// On a 401 that has not yet been retried, the session is refreshed
    /// single-flight and the request re-issued once. A 401 on the retried
    /// attempt surfaces as [`ApiError::Unauthorized`] — never a second
    /// refresh cycle for the same request.
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut retried = false;
        loop {
            let mut req = self.client.request(method.clone(), self.url(path));
            if let Some(body) = body {
                req = req.json(body);
            }
            let resp = req.send().await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                if retried {
                    return Err(ApiError::Unauthorized);
                }
                retried = true;
                match self.gate.run(self.refresh_session()).await {
                    RefreshOutcome::Refreshed => continue,
                    RefreshOutcome::Failed(e) => return Err(ApiError::RefreshFailed(e)),
                }
            }

            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(ApiError::Status(status.as_u16(), text));
            }

            let bytes = resp.bytes().await?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()));
        }
    }

    /// `POST /token/refresh/` — re-establish the session cookie.
    ///
    /// Issued directly, outside the retry loop: a 401 here is final.
    async fn refresh_session(&self) -> anyhow::Result<()> {
        let resp = self.client.post(self.url("/token/refresh/")).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("refresh failed ({status}): {text}");
        }
        let _body: RefreshResponse = resp.json().await?;
        tracing::debug!("session refreshed");
        Ok(())
    }
}
