use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::api::envelope;
use crate::api::errors::ApiError;
use crate::core::config::Settings;
use crate::session::AuthSession;

const BEARER_PREFIX: &str = "Bearer ";

/// Shared HTTP client for the Testly API: owns the base URL, timeouts, and
/// bearer-token injection. Endpoint wrappers build on the `get`/`post`/...
/// helpers and never touch reqwest directly.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    http: Client,
    base_url: String,
    session: AuthSession,
}

impl ApiClient {
    pub(crate) fn from_settings(settings: &Settings, session: AuthSession) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(settings.api().connect_timeout_seconds))
            .timeout(Duration::from_secs(settings.api().request_timeout_seconds))
            .build()
            .context("Failed to build Testly HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.api().base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub(crate) fn session(&self) -> &AuthSession {
        &self.session
    }

    pub(crate) async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None, false).await
    }

    pub(crate) async fn get_authed(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None, true).await
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Some(body), false).await
    }

    pub(crate) async fn post_authed(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Some(body), true).await
    }

    pub(crate) async fn put_authed(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, Some(body), true).await
    }

    pub(crate) async fn delete_authed(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, None, true).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authed: bool,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, &url);

        if authed {
            // Absence of a token is "cannot proceed", surfaced immediately;
            // the server is never asked without credentials.
            let token = self.session.token().ok_or(ApiError::Unauthorized)?;
            builder = builder.header(reqwest::header::AUTHORIZATION, format!("{BEARER_PREFIX}{token}"));
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        let payload = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str::<Value>(&raw).map_err(|err| {
                ApiError::Unexpected(format!("non-JSON body from {path} (status {status}): {err}"))
            })?
        };

        if status.is_success() {
            return Ok(payload);
        }

        let detail = envelope::extract_error_message(&payload);
        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(detail),
            StatusCode::NOT_FOUND => ApiError::NotFound(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(detail)
            }
            _ => ApiError::Unexpected(format!("{path} failed (status {status}): {detail}")),
        })
    }
}
