//! GetSongBPM HTTP client
//!
//! See: https://getsongbpm.com/api
//!
//! ## API Quirks
//!
//! ### Host
//! `api.getsongbpm.com` sits behind a bot challenge that blocks plain HTTP
//! clients. `api.getsong.co` serves the same API without it, so that is the
//! default base URL.
//!
//! ### Search by title only
//! Combined "title artist" lookups return poor results. We search by the
//! cleaned title and pick the artist client-side (see `matching`).
//!
//! ### Errors in 200 responses
//! A dead key can come back as HTTP 200 with `{"error": "Invalid API Key"}`;
//! the adapter maps that to [`LookupError::Unauthorized`] like a 401.

use async_trait::async_trait;

use super::{adapter, dto};
use crate::enrichment::domain::{LookupError, LookupQuery, SongCandidate};
use crate::enrichment::matching::clean_search_term;
use crate::enrichment::traits::FeatureLookup;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.getsong.co";

/// GetSongBPM API client
pub struct GetSongBpmClient {
    api_key: String,
    http_client: reqwest::Client,
    base_url: String,
}

impl GetSongBpmClient {
    /// Create a new client with the given API key against the default host.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LookupError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL.
    ///
    /// An empty key is rejected here so a run never starts without one.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, LookupError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LookupError::MissingCredential);
        }

        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            api_key,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, title: &str) -> String {
        format!(
            "{}/search/?api_key={}&type=song&lookup={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&clean_search_term(title))
        )
    }

    /// Search songs by title.
    pub async fn search(&self, query: &LookupQuery) -> Result<Vec<SongCandidate>, LookupError> {
        let response = self.send_search_request(&query.title).await?;
        adapter::to_candidates(response)
    }

    async fn send_search_request(&self, title: &str) -> Result<dto::SearchResponse, LookupError> {
        let response = self
            .http_client
            .get(self.search_url(title))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LookupError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LookupError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!(
                "HTTP {}: {} - {}",
                status,
                status.canonical_reason().unwrap_or("Unknown"),
                body.chars().take(200).collect::<String>()
            );
            // 5xx is worth another pass; other 4xx means the request itself is wrong
            if status.is_server_error() {
                return Err(LookupError::Network(detail));
            }
            return Err(LookupError::Api(detail));
        }

        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FeatureLookup for GetSongBpmClient {
    async fn search(&self, query: &LookupQuery) -> Result<Vec<SongCandidate>, LookupError> {
        GetSongBpmClient::search(self, query).await
    }
}
