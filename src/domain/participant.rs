//! Registered competitor record.

use crate::domain::{Category, Decimal, Market, TelegramId};
use serde::{Deserialize, Serialize};

/// A registered competitor.
///
/// `market`, `instruments`, `initial_deposit` and `currency` are fixed at
/// registration; only `display_name` and `avatar_url` may change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Internal surrogate id.
    pub id: i64,
    /// External identity assigned by Telegram. Unique.
    pub telegram_id: TelegramId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    /// Non-empty set of instrument tags the participant trades.
    pub instruments: Vec<String>,
    /// Deposit reported at registration; the ranking baseline.
    pub initial_deposit: Decimal,
    /// Currency the initial deposit was quoted in.
    pub currency: String,
    /// Bracket computed at registration. Nullable in the store but always
    /// set by the registration path.
    pub category: Option<Category>,
    /// Registration time in milliseconds since Unix epoch.
    pub registered_at: i64,
}

/// Fields for a registration insert, before the surrogate id exists.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub telegram_id: TelegramId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub market: Market,
    pub instruments: Vec<String>,
    pub initial_deposit: Decimal,
    pub currency: String,
    pub category: Category,
    pub registered_at: i64,
}

/// Trim instrument tags, drop empties, and dedup preserving first occurrence.
pub fn normalize_instruments(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_ascii_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_dedups() {
        let raw = vec![
            " SBER ".to_string(),
            "GAZP".to_string(),
            "sber".to_string(),
            "".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_instruments(&raw), vec!["SBER", "GAZP"]);
    }

    #[test]
    fn normalize_keeps_order() {
        let raw = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(normalize_instruments(&raw), vec!["b", "a"]);
    }
}
