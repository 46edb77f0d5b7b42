use crate::error::ClientError;
use reqwest::header::{HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::Request;
use std::path::Path;

/// Mutates a request after it has been built, before it is sent.
pub trait RequestOption: Send + Sync {
    fn apply(&self, request: &mut Request) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Cookies read from a `name=value; name=value` export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        let mut cookies = Vec::new();

        for entry in text.split("; ").flat_map(|chunk| chunk.split('\n')) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (name, value) = entry.split_once('=').ok_or_else(|| {
                ClientError::Configuration(format!("cookie entry without '=': {entry}"))
            })?;

            cookies.push(Cookie {
                name: name.to_string(),
                value: value.to_string(),
            });
        }

        Ok(Self { cookies })
    }

    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Bearer(String),
    Cookies(CookieJar),
}

impl RequestOption for Credentials {
    fn apply(&self, request: &mut Request) -> Result<(), ClientError> {
        let (name, raw) = match self {
            Credentials::Anonymous => return Ok(()),
            Credentials::Bearer(token) => (AUTHORIZATION, format!("Bearer {token}")),
            Credentials::Cookies(jar) if jar.is_empty() => return Ok(()),
            Credentials::Cookies(jar) => (COOKIE, jar.header_value()),
        };

        let mut value = HeaderValue::from_str(&raw).map_err(|error| {
            ClientError::Configuration(format!("invalid {name} header: {error}"))
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(name, value);
        Ok(())
    }
}
