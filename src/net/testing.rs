//! Scripted fetcher for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Fetcher, Request, Response};
use crate::error::{Result, SuiteError};

/// Answers from a fixed route table keyed by request path; unknown paths are
/// 404. While offline every fetch fails with a network error. An optional
/// delay makes every fetch yield before answering.
#[derive(Debug, Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, url: &str, response: Response) -> Self {
        self.route(url, response);
        self
    }

    pub fn route(&self, url: &str, response: Response) {
        let key = route_key(&Request::get(url));
        self.routes.lock().unwrap().insert(key, response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn route_key(request: &Request) -> String {
    if request.is_absolute() {
        request.url.split('?').next().unwrap_or_default().to_string()
    } else {
        request.path()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(SuiteError::Network("offline".to_string()));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(&route_key(request))
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}
