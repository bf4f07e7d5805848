//! Request and response values passed between fetchers.

use serde::de::DeserializeOwned;

use crate::error::{Result, SuiteError};

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page load; eligible for the offline index fallback
    Navigate,
    /// Script, style, image or data request
    #[default]
    Resource,
}

/// An outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub mode: RequestMode,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Resource,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Navigate,
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Whether the URL names a host instead of an origin-relative path.
    pub fn is_absolute(&self) -> bool {
        self.host().is_some()
    }

    /// Host of an absolute `http(s)` URL; `None` for origin-relative paths.
    pub fn host(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.url).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.host_str().map(str::to_string)
    }

    /// Key the response is cached under.
    ///
    /// Origin-relative paths are normalized to a single leading `/` (so
    /// `index.html`, `./index.html` and `/index.html` share an entry); the
    /// query string is part of the key. Absolute URLs are used as-is.
    pub fn cache_key(&self) -> String {
        if self.is_absolute() {
            return self.url.clone();
        }
        let trimmed = self.url.trim_start_matches("./").trim_start_matches('/');
        format!("/{}", trimmed)
    }

    /// Path part of the cache key, without the query string.
    pub fn path(&self) -> String {
        let key = self.cache_key();
        match key.split_once('?') {
            Some((path, _)) => path.to_string(),
            None => key,
        }
    }
}

/// A complete response with its body buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 200 response with a JSON body.
    pub fn json_body(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails with `SuiteError::Status` unless the status is 2xx.
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SuiteError::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
