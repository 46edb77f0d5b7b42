use crate::error::HarvestError;
use crate::traits::CodeSearch;
use crate::{SearchJob, SearchOptions, SearchResultPage};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drives one [`SearchJob`] to completion against a [`CodeSearch`] backend.
pub struct SearchRunner<S>
where
    S: CodeSearch,
{
    search: S,
}

impl<S> SearchRunner<S>
where
    S: CodeSearch,
{
    pub fn new(search: S) -> Self {
        Self { search }
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    /// Fetches the first page, then follows continuation tokens while the
    /// service reports more pages and the job's budget allows. Only the last
    /// fetched page is returned; any failure aborts the job.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        job: &SearchJob,
    ) -> Result<SearchResultPage, HarvestError> {
        let mut current = self
            .search
            .search(cancel, &job.query, &SearchOptions::default())
            .await?;
        debug!(
            query = %job.query,
            page = current.page_number,
            total_pages = current.total_pages,
            "fetched initial page"
        );

        while current.has_next_page(job.max_page) {
            let options = SearchOptions::next_after(&current);
            let next = self.search.search(cancel, &job.query, &options).await?;

            if next.page_number != options.page {
                return Err(HarvestError::PageMismatch {
                    requested: options.page,
                    returned: next.page_number,
                });
            }

            debug!(
                query = %job.query,
                page = next.page_number,
                total_pages = next.total_pages,
                "fetched page"
            );
            current = next;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::{token_for, FakeSearch};
    use async_trait::async_trait;

    #[tokio::test]
    async fn zero_budget_fetches_only_initial_page() -> Result<(), HarvestError> {
        let runner = SearchRunner::new(FakeSearch::with_pages("q", 5));
        let page = runner.run(&CancellationToken::new(), &SearchJob::new("q", 0)).await?;

        assert_eq!(runner.search().calls().len(), 1);
        assert_eq!(runner.search().calls()[0].options, SearchOptions::default());
        assert_eq!(page.page_number, 1);
        assert_eq!(page.page_token, token_for("q", 1));
        Ok(())
    }

    #[tokio::test]
    async fn walks_until_total_pages() -> Result<(), HarvestError> {
        let query = "path:**.java class";
        let runner = SearchRunner::new(FakeSearch::with_pages(query, 5));
        let page = runner.run(&CancellationToken::new(), &SearchJob::new(query, 5)).await?;

        let calls = runner.search().calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(page.page_number, 5);
        for (index, call) in calls.iter().enumerate().skip(1) {
            let page = index as u32 + 1;
            assert_eq!(call.options.page, page);
            assert_eq!(call.options.page_token, token_for(query, page - 1));
        }
        Ok(())
    }

    #[tokio::test]
    async fn request_count_is_min_of_total_and_budget() -> Result<(), HarvestError> {
        for (total, budget) in [(1, 5), (3, 5), (5, 3), (4, 4), (7, 1)] {
            let runner = SearchRunner::new(FakeSearch::with_pages("q", total));
            let page = runner
                .run(&CancellationToken::new(), &SearchJob::new("q", budget))
                .await?;
            let expected = total.min(budget);
            let calls = runner.search().calls().len() as u32;
            assert_eq!(calls, expected, "total={total} budget={budget}");
            assert_eq!(page.page_number, expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn keeps_only_last_page_matches() -> Result<(), HarvestError> {
        let runner = SearchRunner::new(FakeSearch::with_pages("q", 3));
        let page = runner.run(&CancellationToken::new(), &SearchJob::new("q", 3)).await?;
        let paths: Vec<_> = page.results.iter().map(|hit| hit.path.as_str()).collect();
        assert_eq!(paths, vec!["q/page-3"]);
        Ok(())
    }

    #[tokio::test]
    async fn failure_mid_walk_aborts_job() {
        let fake = FakeSearch {
            fail_on_page: Some(3),
            ..FakeSearch::with_pages("q", 5)
        };
        let runner = SearchRunner::new(fake);
        let outcome = runner.run(&CancellationToken::new(), &SearchJob::new("q", 5)).await;

        assert!(matches!(outcome, Err(HarvestError::Client(ClientError::Api(_)))));
        assert_eq!(runner.search().calls().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_context_aborts_job() {
        let runner = SearchRunner::new(FakeSearch::with_pages("q", 5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = runner.run(&cancel, &SearchJob::new("q", 5)).await;
        assert!(matches!(outcome, Err(HarvestError::Client(ClientError::Cancelled))));
    }

    struct StuckSearch;

    #[async_trait]
    impl CodeSearch for StuckSearch {
        async fn search(
            &self,
            _cancel: &CancellationToken,
            _query: &str,
            _options: &SearchOptions,
        ) -> Result<SearchResultPage, ClientError> {
            Ok(SearchResultPage {
                page_number: 1,
                total_pages: 4,
                ..SearchResultPage::default()
            })
        }
    }

    #[tokio::test]
    async fn page_that_does_not_advance_is_rejected() {
        let runner = SearchRunner::new(StuckSearch);
        let outcome = runner.run(&CancellationToken::new(), &SearchJob::new("q", 4)).await;
        assert!(matches!(
            outcome,
            Err(HarvestError::PageMismatch {
                requested: 2,
                returned: 1
            })
        ));
    }
}
