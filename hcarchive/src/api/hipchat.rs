use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::retry::{retry_rate_limited, RetryPolicy};
use crate::error::ApiError;
use crate::models::{Message, Page, User};

pub const DEFAULT_API_URL: &str = "https://api.hipchat.com/v2";

/// Date filter of the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// The service-defined "most recent" page, without any date bound.
    Recent,
    /// Messages sent at or before the anchor.
    Before(DateTime<Utc>),
}

impl HistoryWindow {
    pub fn as_query_value(&self) -> String {
        match self {
            HistoryWindow::Recent => "recent".to_string(),
            HistoryWindow::Before(anchor) => anchor.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Position and size of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub start_index: usize,
    pub max_results: usize,
}

#[async_trait]
pub trait HipChatApi {
    async fn list_users(
        &self,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<Vec<User>, ApiError>;

    async fn user_history(
        &self,
        user_id: u64,
        window: HistoryWindow,
        page: PageRequest,
    ) -> Result<Vec<Message>, ApiError>;
}

pub struct HipChatClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HipChatClient {
    pub fn new(base_url: &str, token: &str, retry: RetryPolicy) -> Result<Self, ApiError> {
        if token.trim().is_empty() {
            return Err(ApiError::Auth("no auth token provided".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        let authorization = header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| ApiError::Auth("token contains invalid characters".to_string()))?;
        headers.insert(header::AUTHORIZATION, authorization);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    async fn get_page<T: DeserializeOwned + Send>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        retry_rate_limited(&self.retry, || self.get_page_once(url, query)).await
    }

    async fn get_page_once<T: DeserializeOwned + Send>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        debug!("GET {} {:?}", url, query);
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, body));
        }

        let bytes = response.bytes().await?;
        let page: Page<T> = serde_json::from_slice(&bytes)?;

        Ok(page.items)
    }
}

/// Maps a non-2xx answer to the error the fetch pipeline acts on.
fn classify(status: StatusCode, body: String) -> ApiError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Auth(format!("{}: {}", status, body))
        }
        _ => ApiError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl HipChatApi for HipChatClient {
    async fn list_users(
        &self,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<Vec<User>, ApiError> {
        let url = format!("{}/user", self.base_url);
        let query = [
            ("start-index", page.start_index.to_string()),
            ("max-results", page.max_results.to_string()),
            ("include-deleted", include_deleted.to_string()),
        ];
        self.get_page(&url, &query).await
    }

    async fn user_history(
        &self,
        user_id: u64,
        window: HistoryWindow,
        page: PageRequest,
    ) -> Result<Vec<Message>, ApiError> {
        let url = format!("{}/user/{}/history", self.base_url, user_id);
        let query = [
            ("date", window.as_query_value()),
            ("reverse", "false".to_string()),
            ("start-index", page.start_index.to_string()),
            ("max-results", page.max_results.to_string()),
        ];
        self.get_page(&url, &query).await
    }
}
