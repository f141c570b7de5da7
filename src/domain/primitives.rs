//! Domain primitives: TelegramId, Market, Category.

use serde::{Deserialize, Serialize};

/// Opaque numeric participant identity assigned by Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TelegramId(pub i64);

impl TelegramId {
    /// Create a TelegramId from its numeric value.
    pub fn new(id: i64) -> Self {
        TelegramId(id)
    }

    /// Get the underlying numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TelegramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tradable market a participant competes on. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// Stock exchange instruments.
    Stocks,
    /// Cryptocurrency pairs.
    Crypto,
    /// Foreign exchange pairs.
    Forex,
}

impl Market {
    /// Stable string code used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Stocks => "stocks",
            Market::Crypto => "crypto",
            Market::Forex => "forex",
        }
    }
}

impl std::str::FromStr for Market {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stocks" => Ok(Market::Stocks),
            "crypto" => Ok(Market::Crypto),
            "forex" => Ok(Market::Forex),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tournament bracket by converted initial deposit size.
///
/// Serializes as the bare number 1/2/3 the clients display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Category {
    One,
    Two,
    Three,
}

impl Category {
    /// All brackets in ascending order.
    pub const ALL: [Category; 3] = [Category::One, Category::Two, Category::Three];

    /// Numeric code used for storage and serialization.
    pub fn as_u8(&self) -> u8 {
        match self {
            Category::One => 1,
            Category::Two => 2,
            Category::Three => 3,
        }
    }
}

impl From<Category> for u8 {
    fn from(value: Category) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Category::One),
            2 => Ok(Category::Two),
            3 => Ok(Category::Three),
            other => Err(format!("category must be 1, 2, or 3, got {}", other)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
