use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::BackendError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// `Prefer` header values understood by the table endpoints.
pub(crate) const PREFER_REPRESENTATION: &str = "return=representation";
pub(crate) const PREFER_MINIMAL: &str = "return=minimal";
pub(crate) const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

/// Client for the hosted backend.
///
/// Clone is cheap: clones share the connection pool and the access token,
/// so the identity provider can rotate the token for every table store.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl BackendClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Use `token` as the bearer for every following request.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn headers(&self, prefer: Option<&str>) -> Result<header::HeaderMap, BackendError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", Self::header_value(&self.anon_key)?);

        // Without a user token the project key doubles as the bearer
        let bearer = self
            .access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        headers.insert(
            header::AUTHORIZATION,
            Self::header_value(&format!("Bearer {}", bearer))?,
        );

        if let Some(prefer) = prefer {
            headers.insert("Prefer", Self::header_value(prefer)?);
        }
        Ok(headers)
    }

    fn header_value(value: &str) -> Result<header::HeaderValue, BackendError> {
        header::HeaderValue::from_str(value)
            .map_err(|_| BackendError::InvalidResponse("Invalid characters in header value".to_string()))
    }

    /// Send a request, retrying rate-limited responses with exponential
    /// backoff. Non-success statuses become `BackendError`s.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response, BackendError>
    where
        F: Fn() -> Result<RequestBuilder, BackendError>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()?.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(BackendError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            debug!(url = url, status = %status, "Request failed");
            return Err(BackendError::from_status(status, &body));
        }
    }

    fn request<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        prefer: Option<&str>,
    ) -> Result<RequestBuilder, BackendError> {
        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers(prefer)?)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request)
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, BackendError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let response = self
            .send_with_retry(url, || {
                self.request::<()>(Method::GET, url, query, None, None)
            })
            .await?;
        Self::parse_json(response, url).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
        prefer: Option<&str>,
    ) -> Result<T, BackendError> {
        let response = self
            .send_with_retry(url, || {
                self.request(Method::POST, url, query, Some(body), prefer)
            })
            .await?;
        Self::parse_json(response, url).await
    }

    /// POST whose response body is ignored.
    pub(crate) async fn post_no_content<B: Serialize>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        prefer: Option<&str>,
    ) -> Result<(), BackendError> {
        self.send_with_retry(url, || self.request(Method::POST, url, query, body, prefer))
            .await?;
        Ok(())
    }

    pub(crate) async fn patch<B: Serialize>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<(), BackendError> {
        self.send_with_retry(url, || {
            self.request(Method::PATCH, url, query, Some(body), Some(PREFER_MINIMAL))
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// Table filters
// ============================================================================

/// `column=eq.value`
pub(crate) fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// `column=in.("a","b")`. Values are quoted so commas and parentheses in
/// them survive.
pub(crate) fn in_list<S: AsRef<str>>(values: &[S]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// `order=column.desc`
pub(crate) fn order_desc(column: &str) -> String {
    format!("{}.desc", column)
}
