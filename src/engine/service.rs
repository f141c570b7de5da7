//! Leaderboard service: cache-fronted page reads, always-fresh rank lookup,
//! and post-write invalidation.

use crate::cache::{PageCache, PageKey};
use crate::db::Repository;
use crate::domain::{CategoryFilter, TelegramId};
use crate::engine::ranking::{self, RankedEntry, RankedPage};
use crate::error::AppError;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a current-user rank lookup.
///
/// A participant outside the requested category filter is not an error; the
/// response assembler simply omits the field. Only the caller decides how to
/// surface `Unregistered`.
#[derive(Debug, Clone, PartialEq)]
pub enum RankLookup {
    Ranked(RankedEntry),
    FilteredOut,
    Unregistered,
}

/// Read/invalidate facade over the ranking pipeline, page cache, and store.
pub struct LeaderboardService {
    repo: Arc<Repository>,
    cache: Arc<dyn PageCache>,
}

impl LeaderboardService {
    pub fn new(repo: Arc<Repository>, cache: Arc<dyn PageCache>) -> Self {
        Self { repo, cache }
    }

    /// One leaderboard page for the given filter, served from cache when a
    /// fresh enough copy exists.
    ///
    /// Cache faults degrade to direct computation; they never fail the
    /// request.
    ///
    /// # Errors
    /// Returns an error only if the snapshot store query fails.
    pub async fn page(
        &self,
        filter: CategoryFilter,
        page: u32,
        limit: u32,
        as_of: NaiveDate,
    ) -> Result<RankedPage, AppError> {
        let key = PageKey::new(filter, page, limit);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "leaderboard cache read failed, computing directly"),
        }

        let inputs = self.repo.ranking_inputs(filter.category(), as_of).await?;
        let ranked = ranking::rank(inputs);
        let result = ranking::paginate(&ranked, page, limit);

        if let Err(e) = self.cache.put(key, result.clone()).await {
            warn!(error = %e, "leaderboard cache write failed");
        }

        Ok(result)
    }

    /// A single participant's true global rank within the filtered ordering.
    ///
    /// Always computed fresh: this runs per viewer, and caching per-viewer
    /// results would multiply the key space out of proportion to the win.
    ///
    /// # Errors
    /// Returns an error only if the snapshot store query fails.
    pub async fn lookup(
        &self,
        telegram_id: TelegramId,
        filter: CategoryFilter,
        as_of: NaiveDate,
    ) -> Result<RankLookup, AppError> {
        let inputs = self.repo.ranking_inputs(filter.category(), as_of).await?;
        let ranked = ranking::rank(inputs);

        if let Some(entry) = ranking::find_entry(&ranked, telegram_id) {
            return Ok(RankLookup::Ranked(entry));
        }

        if self.repo.get_participant(telegram_id).await?.is_some() {
            Ok(RankLookup::FilteredOut)
        } else {
            Ok(RankLookup::Unregistered)
        }
    }

    /// Clear the whole page-cache namespace after a deposit write.
    ///
    /// A failure here is logged and swallowed: the write already committed,
    /// and staleness is bounded by the cache TTL.
    pub async fn invalidate(&self) {
        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "leaderboard cache invalidation failed; stale pages expire with TTL");
        }
    }
}
