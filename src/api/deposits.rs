use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthedUser;
use crate::api::AppState;
use crate::domain::{reference_date, Decimal};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositUpdateRequest {
    pub value: Decimal,
    /// Optional explicit date; when present it must be today in the contest
    /// timezone. Past days are closed ranking history and stay immutable.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositUpdateResponse {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositHistoryResponse {
    pub snapshots: Vec<SnapshotDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub date: NaiveDate,
    pub value: Decimal,
    pub updated_at: i64,
}

pub async fn submit_deposit(
    AuthedUser(telegram_id): AuthedUser,
    State(state): State<AppState>,
    Json(req): Json<DepositUpdateRequest>,
) -> Result<Json<DepositUpdateResponse>, AppError> {
    let now = Utc::now();

    if !state.config.contest_open_at(now) {
        return Err(AppError::validation(
            "date",
            "the contest is not currently accepting deposit updates",
        ));
    }

    if req.value.is_negative() {
        return Err(AppError::validation("value", "must be non-negative"));
    }

    let today = reference_date(now, state.config.tz_offset_hours);
    if let Some(date) = req.date {
        if date != today {
            return Err(AppError::validation(
                "date",
                "must be today's date in the contest timezone",
            ));
        }
    }

    let participant = state
        .repo
        .get_participant(telegram_id)
        .await?
        .ok_or_else(|| AppError::NotFound("participant is not registered".to_string()))?;

    state
        .repo
        .upsert_snapshot(participant.id, today, req.value, now.timestamp_millis())
        .await?;

    // The write has committed; a cache fault past this point only delays
    // visibility until TTL expiry.
    state.leaderboard.invalidate().await;

    tracing::info!(
        telegram_id = telegram_id.as_i64(),
        date = %today,
        "deposit snapshot recorded"
    );

    Ok(Json(DepositUpdateResponse {
        date: today,
        value: req.value,
    }))
}

pub async fn get_deposit_history(
    AuthedUser(telegram_id): AuthedUser,
    State(state): State<AppState>,
) -> Result<Json<DepositHistoryResponse>, AppError> {
    let participant = state
        .repo
        .get_participant(telegram_id)
        .await?
        .ok_or_else(|| AppError::NotFound("participant is not registered".to_string()))?;

    let snapshots = state
        .repo
        .snapshots_for(participant.id)
        .await?
        .into_iter()
        .map(|s| SnapshotDto {
            date: s.snapshot_date,
            value: s.value,
            updated_at: s.updated_at,
        })
        .collect();

    Ok(Json(DepositHistoryResponse { snapshots }))
}
