//! Fetch implementations.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Request, Response};
use crate::error::{Result, SuiteError};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Something that turns a request into a response.
///
/// Like the browser `fetch`, a non-2xx status is still `Ok`; `Err` means no
/// response was obtained at all.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

// == HTTP Fetcher ==
/// Fetcher backed by `reqwest`.
///
/// Relative URLs are resolved against `base_url`; without one only absolute
/// URLs can be fetched. Clone is cheap, the client is reference counted.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    fn resolve(&self, request: &Request) -> Result<String> {
        if request.is_absolute() {
            return Ok(request.url.clone());
        }
        match &self.base_url {
            Some(base) => Ok(format!("{}{}", base, request.cache_key())),
            None => Err(SuiteError::InvalidRequest(format!(
                "relative URL without a base: {}",
                request.url
            ))),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = self.resolve(request)?;
        debug!("GET {}", url);

        let resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

// == Static Directory Fetcher ==
/// Fetcher serving files below a root directory, like a static web host.
///
/// `/` maps to `index.html`; missing files and paths escaping the root are 404.
#[derive(Debug, Clone)]
pub struct StaticDirFetcher {
    root: PathBuf,
}

impl StaticDirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, request: &Request) -> Option<PathBuf> {
        let path = request.path();
        let relative = path.trim_start_matches('/');
        let relative = if relative.is_empty() || relative.ends_with('/') {
            format!("{}index.html", relative)
        } else {
            relative.to_string()
        };

        let relative = Path::new(&relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl Fetcher for StaticDirFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        if request.is_absolute() {
            return Err(SuiteError::Network(format!(
                "{} is not served by the static origin",
                request.url
            )));
        }

        let Some(path) = self.resolve(request) else {
            return Ok(Response::new(404, "Not Found"));
        };

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Response::new(200, body).with_header("content-type", content_type(&path))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Response::new(404, "Not Found"))
            }
            Err(err) => Err(SuiteError::Network(err.to_string())),
        }
    }
}

/// Content type from the file extension.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Suite</h1>").unwrap();
        std::fs::create_dir_all(dir.path().join("database")).unwrap();
        std::fs::write(dir.path().join("database/calendario.json"), "[]").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_static_dir_serves_index_for_root() {
        let dir = site();
        let fetcher = StaticDirFetcher::new(dir.path());

        let resp = fetcher.fetch(&Request::navigate("/")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.text(), "<h1>Suite</h1>");
        assert_eq!(resp.content_type(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_static_dir_ignores_query_string() {
        let dir = site();
        let fetcher = StaticDirFetcher::new(dir.path());

        let resp = fetcher
            .fetch(&Request::get("./database/calendario.json?t=1"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type(), Some("application/json"));

        let referred = fetcher
            .fetch(&Request::get("/index.html?ref=https://example.com"))
            .await
            .unwrap();
        assert_eq!(referred.text(), "<h1>Suite</h1>");
    }

    #[tokio::test]
    async fn test_static_dir_missing_and_escaping_paths_are_404() {
        let dir = site();
        let fetcher = StaticDirFetcher::new(dir.path());

        let missing = fetcher.fetch(&Request::get("/nope.css")).await.unwrap();
        assert_eq!(missing.status, 404);

        let escaping = fetcher.fetch(&Request::get("/../secret")).await.unwrap();
        assert_eq!(escaping.status, 404);
    }

    #[tokio::test]
    async fn test_static_dir_rejects_external_urls() {
        let dir = site();
        let fetcher = StaticDirFetcher::new(dir.path());

        let result = fetcher.fetch(&Request::get("https://example.com/")).await;
        assert!(matches!(result, Err(SuiteError::Network(_))));
    }

    #[test]
    fn test_http_fetcher_resolves_against_base() {
        let fetcher = HttpFetcher::new(Some("http://localhost:8080/".to_string())).unwrap();
        let url = fetcher.resolve(&Request::get("index.html")).unwrap();
        assert_eq!(url, "http://localhost:8080/index.html");

        let bare = HttpFetcher::new(None).unwrap();
        assert!(bare.resolve(&Request::get("index.html")).is_err());

        let referred = fetcher
            .resolve(&Request::get("/index.html?ref=https://x.dev"))
            .unwrap();
        assert_eq!(referred, "http://localhost:8080/index.html?ref=https://x.dev");
    }
}
