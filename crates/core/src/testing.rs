use crate::error::ClientError;
use crate::models::{SearchOptions, SearchResultPage};
use crate::traits::CodeSearch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Serves `router` on an ephemeral port and returns `http://<addr>/api/`.
pub async fn serve(router: axum::Router) -> std::io::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}/api/"))
}

/// A base URL whose port was bound and then released.
pub async fn unreachable_base_url() -> std::io::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api/"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub query: String,
    pub options: SearchOptions,
}

/// Paginates deterministically: page N of a query reports `total_pages`
/// from the table (default 1), carries token `"<query>#<N>"`, and has one
/// match whose path is `"<query>/page-<N>"`.
#[derive(Default)]
pub struct FakeSearch {
    pub total_pages: HashMap<String, u32>,
    pub fail_on_page: Option<u32>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl FakeSearch {
    pub fn with_pages(query: &str, total_pages: u32) -> Self {
        let mut fake = Self::default();
        fake.total_pages.insert(query.to_string(), total_pages);
        fake
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

pub fn token_for(query: &str, page: u32) -> String {
    format!("{query}#{page}")
}

#[async_trait]
impl CodeSearch for FakeSearch {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResultPage, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                query: query.to_string(),
                options: options.clone(),
            });
        }

        let page_number = options.page.max(1);
        if self.fail_on_page == Some(page_number) {
            return Err(ClientError::Api(crate::models::ErrorResponse {
                status: 500,
                message: "boom".to_string(),
                ..Default::default()
            }));
        }

        Ok(SearchResultPage {
            page_number,
            total_pages: self.total_pages.get(query).copied().unwrap_or(1),
            page_token: token_for(query, page_number),
            results: vec![crate::models::CodeMatch {
                path: format!("{query}/page-{page_number}"),
                ..Default::default()
            }],
            ..Default::default()
        })
    }
}
