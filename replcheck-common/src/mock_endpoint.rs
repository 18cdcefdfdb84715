//! In-memory endpoint fixtures for tests.
//!
//! `MockFetcher` answers GET and HEAD requests from a URL-keyed table
//! and never opens a socket. Hosts can be marked unreachable so every
//! request to them fails like a connection timeout. Clones share state,
//! which lets a test mutate the served content while a pipeline holds
//! another handle (e.g. to publish a new revision between wait-loop
//! iterations).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::FetchError;
use crate::transport::Fetcher;
use crate::urls;

/// One request observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub method: &'static str,
    pub url: String,
}

#[derive(Debug, Default)]
struct MockState {
    bodies: HashMap<String, Vec<u8>>,
    heads: HashSet<String>,
    unreachable_hosts: HashSet<String>,
    requests: Vec<MockRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<MockState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A test that panicked while holding the lock already failed.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Serve `body` for GET (and HEAD) requests to `url`.
    pub fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> &Self {
        let url = url.into();
        let mut state = self.state();
        state.heads.insert(url.clone());
        state.bodies.insert(url, body.into());
        self
    }

    /// Answer HEAD requests to `url` with success, without a GET body.
    pub fn serve_head(&self, url: impl Into<String>) -> &Self {
        self.state().heads.insert(url.into());
        self
    }

    /// Stop serving `url`; subsequent requests get a not-found answer.
    pub fn remove(&self, url: &str) -> &Self {
        let mut state = self.state();
        state.bodies.remove(url);
        state.heads.remove(url);
        self
    }

    /// Fail every request to `host` with a timeout.
    pub fn unreachable_host(&self, host: impl Into<String>) -> &Self {
        self.state()
            .unreachable_hosts
            .insert(host.into().to_ascii_lowercase());
        self
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.state().requests.clone()
    }

    /// Number of GET requests issued for `url`.
    pub fn get_count(&self, url: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == "GET" && r.url == url)
            .count()
    }

    fn record(&self, method: &'static str, url: &str) -> Result<(), FetchError> {
        let mut state = self.state();
        state.requests.push(MockRequest {
            method,
            url: url.to_string(),
        });
        let unreachable = urls::host_of(url)
            .map(|host| state.unreachable_hosts.contains(&host))
            .unwrap_or(false);
        if unreachable {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

impl Fetcher for MockFetcher {
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        self.record("GET", url)?;
        Ok(self.state().bodies.get(url).cloned())
    }

    fn head(&self, url: &str) -> Result<bool, FetchError> {
        self.record("HEAD", url)?;
        Ok(self.state().heads.contains(url))
    }
}
