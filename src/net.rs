//! Shared HTTP plumbing
//!
//! Client construction and the per-URL in-flight registry that lets a new
//! request for a URL cancel a still-pending one.

use crate::constants::api::USER_AGENT;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Build an HTTP client with the crate's User-Agent and a request timeout
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(Error::from)
}

/// Registry of outstanding requests, at most one per exact URL
#[derive(Debug, Default)]
pub struct InflightRequests {
    next_id: AtomicU64,
    active: Mutex<HashMap<String, (u64, CancellationToken)>>,
}

impl InflightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request for `url`, cancelling any previous one for it
    pub fn begin(self: &Arc<Self>, url: &str) -> InflightGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self
            .active
            .lock()
            .insert(url.to_string(), (id, token.clone()));

        if let Some((_, previous)) = previous {
            debug!(url, "superseding pending request");
            previous.cancel();
        }

        InflightGuard {
            registry: Arc::clone(self),
            url: url.to_string(),
            id,
            token,
        }
    }

    /// Number of requests currently registered
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for one registered request
///
/// Dropping the guard cancels its token and unregisters it, so a request
/// abandoned by a timeout stops as soon as it next yields.
#[derive(Debug)]
pub struct InflightGuard {
    registry: Arc<InflightRequests>,
    url: String,
    id: u64,
    token: CancellationToken,
}

impl InflightGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Drive `request` until it finishes or this guard is cancelled
    pub async fn run<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled(self.url.clone())),
            result = request => result,
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.token.cancel();
        let mut active = self.registry.active.lock();
        if active.get(&self.url).is_some_and(|(id, _)| *id == self.id) {
            active.remove(&self.url);
        }
    }
}
