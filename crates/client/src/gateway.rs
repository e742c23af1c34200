//! Authorized request gateway.
//!
//! Every outbound call goes through here: the current credential is read
//! from the store and attached, and inbound responses are inspected for
//! authorization failure before the caller sees them.

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, ErrorBody, Result};
use labrec_core::Pagination;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

/// List response envelope: `{ data, pagination }`.
///
/// Decoding is strict; a success body missing either member is surfaced as a
/// server failure rather than silently defaulting to an empty collection.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Wrapper around one `reqwest::Client` carrying the fixed request timeout
/// and the credential store.
pub struct Gateway {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<CredentialStore>,
}

impl Gateway {
    pub fn new(config: &ClientConfig, store: Arc<CredentialStore>) -> Result<Self> {
        let base_url = Url::parse(&config.server_url).map_err(|e| {
            Error::Config(format!("invalid server URL {:?}: {e}", config.server_url))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            store,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("failed to build URL for {path}: {e}")))
    }

    /// The `Authorization` value for the current credential, if one is held.
    ///
    /// A value already of the form `Bearer <x>` is used verbatim; anything
    /// else gets the scheme prepended. An absent or empty credential yields
    /// no header at all, never an empty one.
    fn bearer(&self) -> Option<String> {
        let token = self.store.get()?;
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if token.starts_with("Bearer ") {
            Some(token.to_string())
        } else {
            Some(format!("Bearer {token}"))
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let (request, authorized) = match self.bearer() {
            Some(value) => (request.header(AUTHORIZATION, value), true),
            None => (request, false),
        };
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.classify_failure(status, &body, authorized))
    }

    fn classify_failure(&self, status: StatusCode, body: &str, authorized: bool) -> Error {
        let parsed = ErrorBody::parse(body);
        if status == StatusCode::UNAUTHORIZED {
            // Session-invalidating when the rejected request carried our
            // credential; a plain failed login leaves prior state alone.
            // Navigation and retry are the caller's concern.
            if authorized {
                tracing::warn!("credential rejected by the service; clearing stored session");
                self.store.set(None);
            }
            return Error::Authorization(
                parsed
                    .message()
                    .unwrap_or_else(|| "credential rejected".to_string()),
            );
        }
        if status.is_server_error() {
            return Error::Server(parsed.message().unwrap_or_else(|| format!("HTTP {status}")));
        }
        Error::Validation {
            message: parsed.message().unwrap_or_else(|| format!("HTTP {status}")),
            details: parsed.details.unwrap_or_default(),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Server(format!("malformed response body: {e}")))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.send(self.http.get(self.url(path)?).query(query)).await?;
        Self::decode(response).await
    }

    /// GET a paginated collection in the documented envelope.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>> {
        self.get_json(path, query).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(self.http.post(self.url(path)?).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(self.http.put(self.url(path)?).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.http.delete(self.url(path)?)).await?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Network(format!("request timed out: {err}"))
    } else {
        Error::Network(err.to_string())
    }
}
