//! Mock rate source for testing without network calls.

use super::{ExchangeRates, RateError};
use crate::domain::Decimal;
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock rate source returning predefined rates.
#[derive(Debug, Clone, Default)]
pub struct MockRateSource {
    rates: HashMap<(String, String), Decimal>,
    fail: bool,
}

impl MockRateSource {
    /// Create a mock with no rates configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rate for a currency pair.
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_uppercase(), to.to_uppercase()), rate);
        self
    }

    /// Make every lookup fail with a network error.
    pub fn failing() -> Self {
        Self {
            rates: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ExchangeRates for MockRateSource {
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal, RateError> {
        if self.fail {
            return Err(RateError::NetworkError("mock rate source down".to_string()));
        }

        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from == to {
            return Ok(Decimal::from_str_canonical("1").expect("1 parses"));
        }

        self.rates
            .get(&(from.clone(), to))
            .copied()
            .ok_or(RateError::UnknownCurrency(from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_configured_rate() {
        let mock = MockRateSource::new().with_rate(
            "USD",
            "RUB",
            Decimal::from_str_canonical("90").unwrap(),
        );
        let rate = mock.get_rate("usd", "rub").await.unwrap();
        assert_eq!(rate.to_canonical_string(), "90");
    }

    #[tokio::test]
    async fn test_mock_unknown_currency() {
        let mock = MockRateSource::new();
        assert!(matches!(
            mock.get_rate("XYZ", "RUB").await,
            Err(RateError::UnknownCurrency(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockRateSource::failing();
        assert!(matches!(
            mock.get_rate("USD", "RUB").await,
            Err(RateError::NetworkError(_))
        ));
    }
}
