//! Identity extraction for authenticated routes.
//!
//! The Telegram init-data signature is verified by an upstream collaborator,
//! which forwards the participant id in `x-telegram-id`. This extractor
//! trusts that header per the identity contract; it never re-verifies.

use crate::domain::TelegramId;
use crate::error::AppError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

const IDENTITY_HEADER: &str = "x-telegram-id";

/// The verified identity of the calling participant.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub TelegramId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IDENTITY_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", IDENTITY_HEADER)))?;

        let id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                AppError::Unauthorized(format!("malformed {} header", IDENTITY_HEADER))
            })?;

        Ok(AuthedUser(TelegramId::new(id)))
    }
}
