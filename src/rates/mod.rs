//! Exchange-rate collaborator used once per registration to convert a
//! foreign-currency deposit before bracket classification.

use crate::domain::Decimal;
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpRateSource;
pub use mock::MockRateSource;

/// Rate lookup seam.
///
/// The core needs a rate value or an explicit failure; it deliberately has
/// no silent hardcoded-default tier, so a failed lookup surfaces as a
/// retryable error instead of a mis-bracketed participant.
#[async_trait]
pub trait ExchangeRates: Send + Sync + fmt::Debug {
    /// How many units of `to` one unit of `from` is worth.
    ///
    /// Must return exactly 1 when the currencies are equal.
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal, RateError>;
}

/// Error type for rate lookups.
#[derive(Debug, Clone)]
pub enum RateError {
    /// Network error (connection timeout, DNS failure).
    NetworkError(String),
    /// HTTP error (429 rate limit, 5xx server error).
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed quote document).
    ParseError(String),
    /// The requested currency is not present in the quote document.
    UnknownCurrency(String),
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            RateError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            RateError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            RateError::UnknownCurrency(code) => write!(f, "Unknown currency: {}", code),
        }
    }
}

impl std::error::Error for RateError {}
