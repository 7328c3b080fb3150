use reqwest::{header::HeaderMap, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Access denied")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Invalid response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct RemoteError {
    message: String,
}

/// Rows plus the exact count reported in `Content-Range`.
#[derive(Debug, Clone)]
pub struct CountedRows<T> {
    pub rows: Vec<T>,
    pub exact_count: Option<u64>,
}

/// Thin client for the Supabase REST endpoint (`/rest/v1`).
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, ApiError> {
        // On wasm, we can't use timeout
        #[cfg(target_arch = "wasm32")]
        let client = Client::new();

        #[cfg(not(target_arch = "wasm32"))]
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(ApiClient {
            inner: Arc::new(ApiClientInner {
                base_url: base_url.trim_end_matches('/').to_string(),
                anon_key: anon_key.to_string(),
                client,
            }),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.inner.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.inner.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", self.inner.anon_key))
    }

    /// `GET` with `Prefer: count=exact`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<CountedRows<T>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.table_url(table))
            .query(params)
            .header("Prefer", "count=exact");

        let response = self.authorize(request).send().await?;
        let exact_count = parse_content_range(response.headers());
        let rows = self.handle_response::<Vec<T>>(response).await?;
        Ok(CountedRows { rows, exact_count })
    }

    pub async fn insert<B: Serialize>(&self, table: &str, body: &B) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .post(self.table_url(table))
            .json(body)
            .header("Prefer", "return=minimal");

        let response = self.authorize(request).send().await?;
        self.handle_empty_response(response).await
    }

    /// `PATCH` the rows matching `params`, returning the updated rows.
    pub async fn update<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, ApiError> {
        let request = self
            .inner
            .client
            .patch(self.table_url(table))
            .query(params)
            .json(body)
            .header("Prefer", "return=representation");

        let response = self.authorize(request).send().await?;
        self.handle_response(response).await
    }

    /// `DELETE` the rows matching `params`, returning the deleted rows.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let request = self
            .inner
            .client
            .delete(self.table_url(table))
            .query(params)
            .header("Prefer", "return=representation");

        let response = self.authorize(request).send().await?;
        self.handle_response(response).await
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(error_for_status(status, &text))
            }
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::PARTIAL_CONTENT => {
                response.json::<T>().await.map_err(|e| ApiError::Parse(e.to_string()))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(error_for_status(status, &text))
            }
        }
    }
}

fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        StatusCode::NOT_FOUND => ApiError::NotFound(remote_message(body)),
        _ => ApiError::Server(remote_message(body)),
    }
}

/// The store's own message when the body is a PostgREST error, else the raw body.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<RemoteError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}

/// `Content-Range: 0-24/3573` -> 3573. `*/*` (unknown total) -> `None`.
fn parse_content_range(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get("content-range")?.to_str().ok()?;
    parse_range_total(value)
}

fn parse_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}
