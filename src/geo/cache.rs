use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

/// Host to label cache for one run.
///
/// Each host owns a `OnceCell`, so concurrent lookups of the same host wait
/// for the first resolution instead of repeating it, and a reader never
/// sees a half-written label.
#[derive(Debug, Default)]
pub struct GeoCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl GeoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `host`, created empty on first use.
    pub(crate) async fn cell(&self, host: &str) -> Arc<OnceCell<String>> {
        let mut entries = self.entries.lock().await;
        entries
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Cached label for `host`, if its resolution has finished.
    pub async fn get(&self, host: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries.get(host).and_then(|cell| cell.get().cloned())
    }

    /// Number of hosts with a finished resolution.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Enforces a minimum delay between consecutive calls, across all callers.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        RateLimiter {
            min_delay,
            last: Mutex::new(None),
        }
    }

    /// Wait until at least `min_delay` has passed since the previous call.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready = prev + self.min_delay;
            if ready > Instant::now() {
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}
