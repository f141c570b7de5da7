use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthedUser;
use crate::api::AppState;
use crate::db::repo::is_unique_violation;
use crate::domain::{
    normalize_instruments, Category, Decimal, Market, NewParticipant, Participant,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    pub instruments: Vec<String>,
    pub initial_deposit: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub telegram_id: i64,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    pub instruments: Vec<String>,
    pub initial_deposit: Decimal,
    pub currency: String,
    pub deposit_category: Option<Category>,
    pub registered_at: i64,
}

impl From<Participant> for ParticipantDto {
    fn from(p: Participant) -> Self {
        Self {
            telegram_id: p.telegram_id.as_i64(),
            display_name: p.display_name,
            avatar_url: p.avatar_url,
            market: p.market,
            instruments: p.instruments,
            initial_deposit: p.initial_deposit,
            currency: p.currency,
            deposit_category: p.category,
            registered_at: p.registered_at,
        }
    }
}

pub async fn register(
    AuthedUser(telegram_id): AuthedUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ParticipantDto>), AppError> {
    let display_name = req.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::validation("displayName", "must not be empty"));
    }

    let instruments = normalize_instruments(&req.instruments);
    if instruments.is_empty() {
        return Err(AppError::validation(
            "instruments",
            "at least one instrument is required",
        ));
    }

    // A zero or negative baseline would make percent change meaningless, so
    // it is rejected here rather than tolerated at ranking time.
    if !req.initial_deposit.is_positive() {
        return Err(AppError::validation(
            "initialDeposit",
            "must be greater than zero",
        ));
    }

    let currency = req.currency.trim().to_uppercase();
    if currency.is_empty() || currency.len() > 8 {
        return Err(AppError::validation("currency", "must be a currency code"));
    }

    let bounds = state.config.category_bounds;
    let base = &state.config.base_currency;
    let category = if currency.eq_ignore_ascii_case(base) {
        bounds.classify(req.initial_deposit)
    } else {
        // A failed rate lookup blocks registration: the bracket is fixed
        // forever once persisted, and the caller can simply retry.
        let rate = state
            .rates
            .get_rate(&currency, base)
            .await
            .map_err(|e| AppError::Dependency(format!("exchange rate unavailable: {}", e)))?;
        bounds.classify_converted(req.initial_deposit, &currency, base, rate)
    };

    let new = NewParticipant {
        telegram_id,
        display_name,
        avatar_url: req.avatar_url.filter(|s| !s.trim().is_empty()),
        market: req.market,
        instruments,
        initial_deposit: req.initial_deposit,
        currency,
        category,
        registered_at: Utc::now().timestamp_millis(),
    };

    let participant = state.repo.insert_participant(&new).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("participant is already registered".to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    })?;

    tracing::info!(
        telegram_id = telegram_id.as_i64(),
        category = category.as_u8(),
        "participant registered"
    );

    Ok((StatusCode::CREATED, Json(participant.into())))
}

pub async fn update_profile(
    AuthedUser(telegram_id): AuthedUser,
    State(state): State<AppState>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<ParticipantDto>, AppError> {
    if req.display_name.is_none() && req.avatar_url.is_none() {
        return Err(AppError::validation(
            "displayName",
            "at least one of displayName or avatarUrl is required",
        ));
    }

    let display_name = req
        .display_name
        .map(|s| {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                Err(AppError::validation("displayName", "must not be empty"))
            } else {
                Ok(trimmed)
            }
        })
        .transpose()?;

    let updated = state
        .repo
        .update_profile(
            telegram_id,
            display_name.as_deref(),
            req.avatar_url.as_deref(),
        )
        .await?;
    if !updated {
        return Err(AppError::NotFound(
            "participant is not registered".to_string(),
        ));
    }

    let participant = state
        .repo
        .get_participant(telegram_id)
        .await?
        .ok_or_else(|| AppError::Internal("participant vanished after update".to_string()))?;

    Ok(Json(participant.into()))
}
