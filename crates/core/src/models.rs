use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// One query plus the number of pages the runner may fetch for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchJob {
    pub query: String,
    #[serde(default)]
    pub max_page: u32,
}

impl SearchJob {
    pub fn new(query: impl Into<String>, max_page: u32) -> Self {
        Self {
            query: query.into(),
            max_page,
        }
    }

    /// Hex SHA-1 of the raw query bytes. Jobs that share a query share a
    /// fingerprint regardless of their page budget.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.query.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CodeMatch {
    #[serde(skip_serializing_if = "is_default")]
    pub path: String,
    #[serde(skip_serializing_if = "is_default")]
    pub sha: String,
    #[serde(skip_serializing_if = "is_default")]
    pub ref_name: String,
    #[serde(skip_serializing_if = "is_default")]
    pub language: String,
    #[serde(skip_serializing_if = "is_default")]
    pub repo_id: u64,
    #[serde(skip_serializing_if = "is_default")]
    pub commit_sha: String,
    #[serde(skip_serializing_if = "is_default")]
    pub repo_name: String,
}

/// Decoded body of a single search request.
///
/// `page_number` and `total_pages` are 1-based. `page_token` from page N is
/// only valid for requesting page N + 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SearchResultPage {
    #[serde(skip_serializing_if = "is_default")]
    pub error: String,
    #[serde(skip_serializing_if = "is_default")]
    pub failed: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub epoch_id: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub index_version: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub request_id: String,
    #[serde(skip_serializing_if = "is_default")]
    pub results_count: u64,
    #[serde(rename = "is_treelights_avail", skip_serializing_if = "is_default")]
    pub is_treelights_available: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub search_elapsed_ms: u64,
    #[serde(skip_serializing_if = "is_default")]
    pub page_token: String,
    #[serde(skip_serializing_if = "is_default")]
    pub page_number: u32,
    #[serde(skip_serializing_if = "is_default")]
    pub total_pages: u32,
    #[serde(skip_serializing_if = "is_default")]
    pub serving_offset_queried: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<CodeMatch>,
}

impl SearchResultPage {
    pub fn has_next_page(&self, max_page: u32) -> bool {
        self.page_number < self.total_pages && self.page_number < max_page
    }
}

/// Pagination parameters for one search request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub page: u32,
    pub page_token: String,
}

impl SearchOptions {
    pub fn next_after(page: &SearchResultPage) -> Self {
        Self {
            page: page.page_number.saturating_add(1),
            page_token: page.page_token.clone(),
        }
    }

    /// Query pairs in wire order. `p` is omitted for page 0 and `pageToken`
    /// when empty.
    pub fn query_pairs(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if self.page != 0 {
            pairs.push(("p", self.page.to_string()));
        }
        if !self.page_token.is_empty() {
            pairs.push(("pageToken", self.page_token.clone()));
        }
        pairs.push(("q", query.to_string()));
        pairs
    }
}

/// Quota snapshot taken from the `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rate {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ErrorBody {
    pub message: String,
    pub documentation_url: String,
}

/// A non-success reply from the service. `body` holds the raw response bytes
/// so they stay readable after the error payload was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
    pub documentation_url: Option<String>,
    pub body: Vec<u8>,
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status {}: {}", self.status, self.message)?;
        if let Some(url) = &self.documentation_url {
            write!(f, " ({url})")?;
        }
        Ok(())
    }
}
