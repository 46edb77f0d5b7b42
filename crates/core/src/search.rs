use crate::client::SearchClient;
use crate::traits::CodeSearch;
use crate::{ClientError, SearchOptions, SearchResultPage};
use async_trait::async_trait;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

pub const SEARCH_PATH: &str = "search";

/// `search?p=..&pageToken=..&q=..`, relative to the client's base URL.
pub fn search_path(query: &str, options: &SearchOptions) -> String {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(options.query_pairs(query))
        .finish();
    format!("{SEARCH_PATH}?{encoded}")
}

#[async_trait]
impl CodeSearch for SearchClient {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResultPage, ClientError> {
        let request = self.new_request::<()>(Method::GET, &search_path(query, options), None, &[])?;
        self.execute(cancel, request).await
    }
}
