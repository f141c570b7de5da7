//! TTL cache for leaderboard pages.
//!
//! The cache is a pure performance layer over the snapshot store: reads fall
//! back to direct computation when it misbehaves, and a deposit write clears
//! the whole namespace rather than guessing which pages a rank shift touched.

use crate::domain::CategoryFilter;
use crate::engine::ranking::RankedPage;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use thiserror::Error;

/// Cache key for one leaderboard page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub category: CategoryFilter,
    pub page: u32,
    pub limit: u32,
}

impl PageKey {
    pub fn new(category: CategoryFilter, page: u32, limit: u32) -> Self {
        Self {
            category,
            page,
            limit,
        }
    }
}

/// Error type for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Async page-cache seam.
///
/// Every operation is fallible so callers treat faults as degraded service,
/// not request failures; swapping in an external backend changes nothing
/// upstream.
#[async_trait]
pub trait PageCache: Send + Sync {
    /// Look up a cached page.
    async fn get(&self, key: &PageKey) -> Result<Option<RankedPage>, CacheError>;

    /// Store a page under `key` for the configured TTL.
    async fn put(&self, key: PageKey, page: RankedPage) -> Result<(), CacheError>;

    /// Drop every cached page. Called after each successful deposit write.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// In-process page cache with time-to-live eviction.
pub struct MemoryPageCache {
    inner: Cache<PageKey, RankedPage>,
}

impl MemoryPageCache {
    /// Create a cache whose entries expire `ttl_secs` after insertion.
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_ttl(Duration::from_secs(ttl_secs.max(1)))
    }

    /// Create a cache with an explicit time-to-live.
    pub fn with_ttl(ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &PageKey) -> Result<Option<RankedPage>, CacheError> {
        Ok(self.inner.get(key).await)
    }

    async fn put(&self, key: PageKey, page: RankedPage) -> Result<(), CacheError> {
        self.inner.insert(key, page).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.inner.invalidate_all();
        Ok(())
    }
}
