use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{Category, CategoryFilter, Decimal, Market, TelegramId};
use crate::engine::ranking::{RankedEntry, MAX_PAGE_LIMIT};
use crate::engine::RankLookup;
use crate::error::AppError;

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub category: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub category: String,
    pub total_participants: i64,
    pub page: u32,
    pub limit: u32,
    pub entries: Vec<LeaderboardEntryDto>,
    pub current_user: Option<LeaderboardEntryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub position: i64,
    pub telegram_id: i64,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    pub instruments: Vec<String>,
    pub pnl_percent: Decimal,
    pub is_current_user: bool,
    pub deposit_category: Option<Category>,
}

impl LeaderboardEntryDto {
    fn from_entry(entry: RankedEntry, viewer: Option<TelegramId>) -> Self {
        let is_current_user = viewer == Some(entry.telegram_id);
        Self {
            position: entry.position,
            telegram_id: entry.telegram_id.as_i64(),
            display_name: entry.display_name,
            avatar_url: entry.avatar_url,
            market: entry.market,
            instruments: entry.instruments,
            pnl_percent: entry.pnl_percent,
            is_current_user,
            deposit_category: entry.category,
        }
    }
}

pub async fn get_leaderboard(
    Query(params): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let filter = match params.category.as_deref() {
        None => CategoryFilter::All,
        Some(raw) => CategoryFilter::from_str(raw)
            .map_err(|_| AppError::validation("category", "must be one of: all, 1, 2, 3"))?,
    };

    let page = validate_positive("page", params.page.unwrap_or(1))?;
    let limit = validate_positive("limit", params.limit.unwrap_or(DEFAULT_LIMIT as i64))?;
    if limit > MAX_PAGE_LIMIT {
        return Err(AppError::validation(
            "limit",
            format!("must be at most {}", MAX_PAGE_LIMIT),
        ));
    }

    let viewer = params
        .user_id
        .map(|id| {
            if id > 0 {
                Ok(TelegramId::new(id))
            } else {
                Err(AppError::validation("userId", "must be a positive integer"))
            }
        })
        .transpose()?;

    let as_of = state.config.as_of_date(Utc::now());

    // The cached page and the always-fresh viewer lookup are independent
    // query paths; run them concurrently.
    let page_fut = state.leaderboard.page(filter, page, limit, as_of);
    let lookup_fut = async {
        match viewer {
            Some(id) => state
                .leaderboard
                .lookup(id, filter, as_of)
                .await
                .map(Some),
            None => Ok(None),
        }
    };
    let (ranked_page, lookup) = futures::join!(page_fut, lookup_fut);
    let ranked_page = ranked_page?;

    let current_user = match lookup? {
        Some(RankLookup::Ranked(entry)) => Some(LeaderboardEntryDto::from_entry(entry, viewer)),
        // Absent or filtered out of this bracket: omit the field, not an error.
        Some(RankLookup::FilteredOut) | Some(RankLookup::Unregistered) | None => None,
    };

    let entries = ranked_page
        .entries
        .into_iter()
        .map(|entry| LeaderboardEntryDto::from_entry(entry, viewer))
        .collect();

    Ok(Json(LeaderboardResponse {
        category: filter.as_str().to_string(),
        total_participants: ranked_page.total,
        page,
        limit,
        entries,
        current_user,
    }))
}

fn validate_positive(field: &str, value: i64) -> Result<u32, AppError> {
    if value < 1 {
        return Err(AppError::validation(field, "must be a positive integer"));
    }
    u32::try_from(value).map_err(|_| AppError::validation(field, "is out of range"))
}
