//! Pure ranking pipeline.
//!
//! The repository hands over one `RankingInput` per participant passing the
//! category filter; everything from percent-change computation to pagination
//! happens here, in-process and without I/O, so each stage is testable
//! against plain vectors.

use crate::domain::{Category, Decimal, Market, TelegramId};
use serde::{Deserialize, Serialize};

/// Upper bound on the page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 500;

/// Per-participant raw material for one ranking computation.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingInput {
    pub participant_id: i64,
    pub telegram_id: TelegramId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    pub instruments: Vec<String>,
    pub category: Option<Category>,
    /// Ranking baseline: the deposit reported at registration.
    pub initial_deposit: Decimal,
    /// Latest snapshot value at or before the as-of date, if any.
    pub snapshot_value: Option<Decimal>,
    pub registered_at: i64,
}

/// One row of the computed ranking, annotated with its global position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based standing in the full filtered ordering.
    pub position: i64,
    pub participant_id: i64,
    pub telegram_id: TelegramId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    pub instruments: Vec<String>,
    pub category: Option<Category>,
    pub current_value: Decimal,
    pub pnl_percent: Decimal,
    pub registered_at: i64,
}

/// A page slice plus the filter-wide participant count.
///
/// Viewer-independent: per-viewer flags are stamped at response assembly,
/// never stored here, so the same value is safe to cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage {
    pub entries: Vec<RankedEntry>,
    pub total: i64,
}

/// Compute the full ordering: resolve current values, compute percent
/// change, sort, and annotate 1-based positions.
///
/// The order is total: percent change descending, then registration time
/// ascending (earlier registrants win exact ties), then internal id
/// ascending. Repeated calls over unchanged inputs produce identical output.
pub fn rank(inputs: Vec<RankingInput>) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = inputs
        .into_iter()
        .map(|input| {
            let current = input.snapshot_value.unwrap_or(input.initial_deposit);
            let pnl_percent = Decimal::percent_change(current, input.initial_deposit);
            RankedEntry {
                position: 0,
                participant_id: input.participant_id,
                telegram_id: input.telegram_id,
                display_name: input.display_name,
                avatar_url: input.avatar_url,
                market: input.market,
                instruments: input.instruments,
                category: input.category,
                current_value: current,
                pnl_percent,
                registered_at: input.registered_at,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.pnl_percent
            .cmp(&a.pnl_percent)
            .then_with(|| a.registered_at.cmp(&b.registered_at))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });

    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.position = (idx + 1) as i64;
    }

    entries
}

/// Slice one page out of the full ordering. Positions keep their global
/// values; page 2 with limit 20 starts at position 21.
pub fn paginate(ranked: &[RankedEntry], page: u32, limit: u32) -> RankedPage {
    let start = (page as usize).saturating_sub(1).saturating_mul(limit as usize);
    let entries = ranked
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();
    RankedPage {
        entries,
        total: ranked.len() as i64,
    }
}

/// Find a single participant's entry within the full ordering.
pub fn find_entry(ranked: &[RankedEntry], telegram_id: TelegramId) -> Option<RankedEntry> {
    ranked.iter().find(|e| e.telegram_id == telegram_id).cloned()
}
