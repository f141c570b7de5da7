//! Tournament bracket classification by converted deposit size.

use crate::domain::{Category, Decimal};
use std::str::FromStr;

/// Bracket boundaries in base-currency units.
///
/// Category 1 below `lower`, category 2 in `[lower, upper)`,
/// category 3 at or above `upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryBounds {
    pub lower: Decimal,
    pub upper: Decimal,
}

impl CategoryBounds {
    /// Create bounds; `lower` must be strictly below `upper`.
    pub fn new(lower: Decimal, upper: Decimal) -> Result<Self, String> {
        if lower >= upper {
            return Err(format!(
                "category lower bound {} must be below upper bound {}",
                lower, upper
            ));
        }
        Ok(Self { lower, upper })
    }

    /// Classify a base-currency amount into its bracket.
    ///
    /// Pure and total: every amount lands in exactly one bracket.
    pub fn classify(&self, amount: Decimal) -> Category {
        if amount < self.lower {
            Category::One
        } else if amount < self.upper {
            Category::Two
        } else {
            Category::Three
        }
    }

    /// Classify an amount quoted in `currency`, converting to base units
    /// with `rate` (base-currency units per one unit of `currency`) when the
    /// currencies differ.
    ///
    /// Classification runs once at registration and the result is persisted;
    /// later rate moves never re-bracket a participant.
    pub fn classify_converted(
        &self,
        amount: Decimal,
        currency: &str,
        base_currency: &str,
        rate: Decimal,
    ) -> Category {
        if currency.eq_ignore_ascii_case(base_currency) {
            self.classify(amount)
        } else {
            self.classify(amount * rate)
        }
    }
}

/// Category selector for ranking queries: a single bracket or the whole field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl CategoryFilter {
    /// The bracket to filter by, if any.
    pub fn category(&self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(c) => Some(*c),
        }
    }

    /// String form used in responses and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(Category::One) => "1",
            CategoryFilter::Only(Category::Two) => "2",
            CategoryFilter::Only(Category::Three) => "3",
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(CategoryFilter::All),
            "1" => Ok(CategoryFilter::Only(Category::One)),
            "2" => Ok(CategoryFilter::Only(Category::Two)),
            "3" => Ok(CategoryFilter::Only(Category::Three)),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
