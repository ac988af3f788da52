//! Scanner interface (spec.md §6): an optional producer of the active
//! ticker set. The core consumes only the ticker list; scoring is
//! opaque and out of scope per spec.md §1/§2's supplemented-features
//! boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::core::types::{Ticker, TimestampMs};

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub markets: Vec<Ticker>,
    pub timestamp: TimestampMs,
}

#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self) -> anyhow::Result<ScanResult>;
    fn recommended_tickers(&self) -> Vec<Ticker>;

    /// Start a periodic background scan, invoking `on_complete` with each
    /// result. Default: a single `tokio::spawn`ed loop on a fixed
    /// interval, matching the teacher's periodic-task pattern elsewhere
    /// (`monitoring::server`'s metrics poller).
    fn start_periodic(self: Arc<Self>, interval: Duration, on_complete: Arc<dyn Fn(ScanResult) + Send + Sync>) -> JoinHandle<()>
    where
        Self: 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.scan().await {
                    Ok(result) => on_complete(result),
                    Err(err) => tracing::warn!(%err, "periodic scan failed"),
                }
            }
        })
    }

    fn stop_periodic(&self, handle: JoinHandle<()>) {
        handle.abort();
    }
}

/// In-memory test double: returns a fixed ticker list, with a small
/// cache to exercise `scan_with_cache`'s `from_cache`/`refreshing` shape.
pub struct InMemoryScanner {
    tickers: Vec<Ticker>,
    cache: Mutex<Option<(ScanResult, TimestampMs)>>,
    cache_ttl_ms: i64,
}

impl InMemoryScanner {
    pub fn new(tickers: Vec<Ticker>, cache_ttl_ms: i64) -> Self {
        Self {
            tickers,
            cache: Mutex::new(None),
            cache_ttl_ms,
        }
    }

    /// `(result, from_cache, refreshing)` per spec.md §6.
    pub fn scan_with_cache(&self, now: TimestampMs) -> (ScanResult, bool, bool) {
        let mut cache = self.cache.lock();
        if let Some((result, cached_at)) = cache.as_ref() {
            if now - cached_at < self.cache_ttl_ms {
                return (result.clone(), true, false);
            }
        }
        let fresh = ScanResult {
            markets: self.tickers.clone(),
            timestamp: now,
        };
        *cache = Some((fresh.clone(), now));
        (fresh, false, false)
    }
}

#[async_trait]
impl Scanner for InMemoryScanner {
    async fn scan(&self) -> anyhow::Result<ScanResult> {
        Ok(ScanResult {
            markets: self.tickers.clone(),
            timestamp: crate::core::types::now_ms(),
        })
    }

    fn recommended_tickers(&self) -> Vec<Ticker> {
        self.tickers.clone()
    }
}
