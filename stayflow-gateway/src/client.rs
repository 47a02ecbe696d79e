use crate::endpoints::UserProfile;
use crate::error::ApiError;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub(crate) const REFRESH_PATH: &str = "/api/auth/refresh";
pub(crate) const SESSION_PROBE_PATH: &str = "/api/auth/me";

/// Authenticated request gateway for the booking backend.
///
/// Credentials ride in a shared cookie jar the gateway never inspects. On a
/// 401 the gateway refreshes the credential once and replays the original
/// request once; a second 401, or a 401 from the refresh endpoint itself, is
/// a terminal authentication failure. Some of the calls behind this client
/// are non-idempotent (booking finalize), so the one-refresh-one-replay bound
/// is a hard guarantee, not a tuning knob.
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    /// Session-probe channel: shares the cookie jar but never refreshes or
    /// retries, so a probe on page load cannot start a refresh storm.
    probe_client: Client,
    base_url: String,
}

impl ApiGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .build()
            .expect("reqwest client construction cannot fail with these options");
        let probe_client = Client::builder()
            .cookie_provider(jar)
            .build()
            .expect("reqwest client construction cannot fail with these options");

        Self {
            client,
            probe_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &stayflow_store::Config) -> Self {
        Self::new(config.api.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(Method::GET, path, None).await
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request_json(Method::POST, path, Some(body)).await
    }

    /// Check whether a user session already exists, without side effects.
    /// A 401 here is an answer ("not logged in"), not an error.
    pub async fn probe_session(&self) -> Result<Option<UserProfile>, ApiError> {
        let resp = self
            .execute(&self.probe_client, Method::GET, SESSION_PROBE_PATH, None)
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        decode(resp).await.map(Some)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let _: Value = self
            .request_json(Method::POST, "/api/auth/logout", None)
            .await?;
        Ok(())
    }

    /// Issue a request, refreshing credentials and replaying at most once.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let resp = self
            .execute(&self.client, method.clone(), path, body.as_ref())
            .await?;

        // The refresh endpoint must never trigger a recursive refresh.
        if resp.status() != StatusCode::UNAUTHORIZED || path == REFRESH_PATH {
            return decode(resp).await;
        }

        tracing::debug!(path, "received 401, attempting credential refresh");
        if let Err(err) = self.refresh_credentials().await {
            tracing::warn!(path, %err, "credential refresh failed");
            return Err(ApiError::Unauthorized);
        }

        // One replay only. A second 401 falls through decode() as terminal.
        let retried = self
            .execute(&self.client, method, path, body.as_ref())
            .await?;
        decode(retried).await
    }

    async fn refresh_credentials(&self) -> Result<(), ApiError> {
        let resp = self
            .execute(&self.client, Method::POST, REFRESH_PATH, None)
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            s => Err(ApiError::Status {
                status: s.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn execute(
        &self,
        client: &Client,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let mut req = client.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    let raw = if text.trim().is_empty() { "null" } else { &text };
    serde_json::from_str(raw).map_err(|e| ApiError::Decode(e.to_string()))
}
