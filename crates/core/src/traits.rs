use crate::{ClientError, SearchOptions, SearchResultPage};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait CodeSearch: Send + Sync {
    /// Fetches one page of results for `query`. Default options request the
    /// first page without a continuation token.
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResultPage, ClientError>;
}
