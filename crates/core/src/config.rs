use crate::auth::Credentials;
use std::path::PathBuf;

pub const DEFAULT_CODE_SEARCH_URL: &str = "https://cs.github.com/api/";
pub const DEFAULT_QUEUE_DEPTH: usize = 64;
pub const COOKIE_JAR_FILE: &str = "cookie.combined.txt";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Must parse as a URL ending in `/`; request paths are resolved
    /// relative to it.
    pub base_url: String,
    pub user_agent: Option<String>,
    pub credentials: Credentials,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: None,
            credentials,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CODE_SEARCH_URL.to_string(),
            user_agent: None,
            credentials: Credentials::Anonymous,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub output_dir: PathBuf,
    pub queue_depth: usize,
}

impl DispatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// `<config dir>/codesearch-harvest/cookie.combined.txt`, when the platform
/// has a config directory.
pub fn default_cookie_jar_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("codesearch-harvest").join(COOKIE_JAR_FILE))
}
