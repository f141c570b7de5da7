//! HTTP client for a daily-quotes JSON document.
//!
//! The document maps currency codes to `{ "Nominal": n, "Value": v }`
//! entries quoted in the service's base currency, so a unit of `from` is
//! worth `Value / Nominal` base units.

use super::{ExchangeRates, RateError};
use crate::domain::Decimal;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Rate source backed by a daily-quotes HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    client: Client,
    url: String,
}

impl HttpRateSource {
    /// Create a rate source fetching quotes from `url`.
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    async fn fetch_quotes(&self) -> Result<serde_json::Value, RateError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(15)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                backoff::Error::transient(RateError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(RateError::HttpError {
                    status: status.as_u16(),
                    message: "Transient upstream error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(RateError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(RateError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl ExchangeRates for HttpRateSource {
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal, RateError> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from == to {
            return Decimal::from_str_canonical("1")
                .map_err(|e| RateError::ParseError(e.to_string()));
        }

        debug!(from = %from, to = %to, "fetching exchange rate");

        let document = self.fetch_quotes().await?;
        let quotes = document
            .get("Valute")
            .and_then(|v| v.as_object())
            .ok_or_else(|| {
                RateError::ParseError("quote document has no Valute object".to_string())
            })?;

        let quote = quotes
            .get(&from)
            .ok_or_else(|| RateError::UnknownCurrency(from.clone()))?;

        parse_quote_rate(quote)
    }
}

/// Extract `Value / Nominal` from one quote entry, losslessly.
fn parse_quote_rate(quote: &serde_json::Value) -> Result<Decimal, RateError> {
    let value = decimal_field(quote, "Value")?;
    let nominal = decimal_field(quote, "Nominal")?;
    if nominal.is_zero() {
        return Err(RateError::ParseError("quote nominal is zero".to_string()));
    }
    Ok(value / nominal)
}

fn decimal_field(quote: &serde_json::Value, field: &str) -> Result<Decimal, RateError> {
    let number = quote
        .get(field)
        .filter(|v| v.is_number())
        .ok_or_else(|| RateError::ParseError(format!("quote missing numeric {}", field)))?;

    // Go through the JSON token text to avoid binary-float round-off.
    Decimal::from_str_canonical(&number.to_string())
        .map_err(|e| RateError::ParseError(format!("invalid {}: {}", field, e)))
}
