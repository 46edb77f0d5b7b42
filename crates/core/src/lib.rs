pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod registry;
pub mod runner;
pub mod search;
pub mod traits;

#[cfg(test)]
mod testing;

pub use auth::{Cookie, CookieJar, Credentials, RequestOption};
pub use classify::check_response;
pub use client::{RateLimitState, RawResponse, SearchClient};
pub use config::{
    default_cookie_jar_path, ClientConfig, DispatchOptions, DEFAULT_CODE_SEARCH_URL,
    DEFAULT_QUEUE_DEPTH,
};
pub use dispatch::{
    discover_batch_files, dispatch, output_path, read_batch_file, write_page, DispatchReport,
};
pub use error::{
    AcceptedResponse, ClientError, HarvestError, RateLimitError, SecondaryRateLimitError,
};
pub use models::{CodeMatch, ErrorResponse, Rate, SearchJob, SearchOptions, SearchResultPage};
pub use registry::{find_template, make_search_job, templates, SearchTemplate};
pub use runner::SearchRunner;
pub use tokio_util::sync::CancellationToken;
pub use traits::CodeSearch;
