use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{api::types::server_message, config::ClientConfig, error::ClientError, session::Session};

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn new_with_base_url(base_url: impl Into<String>, session: Session) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer + JSON headers, with the token read from storage on every call.
    pub(crate) async fn get_auth_headers(&self) -> Result<HeaderMap, ClientError> {
        let token = self
            .session
            .token()
            .await?
            .ok_or(ClientError::NotAuthenticated)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::Validation("Invalid token format".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<RawResponse, ClientError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed");
            ClientError::Network(e.to_string())
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Response received");
        Ok(RawResponse { status, body })
    }

    pub(crate) async fn get_authed<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let headers = self.get_auth_headers().await?;
        tracing::debug!(path, "GET");
        let raw = self
            .send(self.client.get(self.endpoint(path)).headers(headers))
            .await?;
        raw.into_result(fallback)
    }

    pub(crate) async fn post_authed<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let headers = self.get_auth_headers().await?;
        tracing::debug!(path, "POST");
        let raw = self
            .send(
                self.client
                    .post(self.endpoint(path))
                    .headers(headers)
                    .json(body),
            )
            .await?;
        raw.into_result(fallback)
    }

    pub(crate) async fn put_authed<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let headers = self.get_auth_headers().await?;
        tracing::debug!(path, "PUT");
        let raw = self
            .send(
                self.client
                    .put(self.endpoint(path))
                    .headers(headers)
                    .json(body),
            )
            .await?;
        raw.into_result(fallback)
    }

    /// Authenticated POST whose response is interpreted by the caller.
    pub(crate) async fn post_authed_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ClientError> {
        let headers = self.get_auth_headers().await?;
        tracing::debug!(path, "POST");
        self.send(
            self.client
                .post(self.endpoint(path))
                .headers(headers)
                .json(body),
        )
        .await
    }

    /// Unauthenticated POST, used by login and signup only.
    pub(crate) async fn post_public<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ClientError> {
        tracing::debug!(path, "POST (public)");
        self.send(
            self.client
                .post(self.endpoint(path))
                .header(CONTENT_TYPE, "application/json")
                .json(body),
        )
        .await
    }
}

/// A response whose body has been read as text but not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Outcome of the typed decode step. Parse failures are values, never panics.
#[derive(Debug)]
pub enum Decoded<T> {
    Value(T),
    Malformed(serde_json::Error),
}

impl RawResponse {
    pub fn decode<T: DeserializeOwned>(&self) -> Decoded<T> {
        match serde_json::from_str(&self.body) {
            Ok(value) => Decoded::Value(value),
            Err(err) => Decoded::Malformed(err),
        }
    }

    /// Decode the body, map non-2xx to a rejection carrying the server's
    /// message (or `fallback`), then convert to `T`.
    pub fn into_result<T: DeserializeOwned>(self, fallback: &str) -> Result<T, ClientError> {
        let value: Value = match self.decode() {
            Decoded::Value(value) => value,
            Decoded::Malformed(err) => {
                tracing::warn!(status = self.status.as_u16(), error = %err, "Malformed server response");
                return Err(ClientError::malformed(self.status.as_u16(), err.to_string()));
            }
        };

        if !self.status.is_success() {
            let message = server_message(&value).unwrap_or_else(|| fallback.to_string());
            return Err(ClientError::rejected(self.status.as_u16(), message));
        }

        serde_json::from_value(value)
            .map_err(|err| ClientError::malformed(self.status.as_u16(), err.to_string()))
    }

    /// Rejection for a non-2xx response whose body may or may not be JSON.
    pub fn rejection(&self, fallback: &str) -> ClientError {
        let message = match self.decode::<Value>() {
            Decoded::Value(value) => server_message(&value),
            Decoded::Malformed(_) => None,
        };
        ClientError::rejected(
            self.status.as_u16(),
            message.unwrap_or_else(|| fallback.to_string()),
        )
    }
}
