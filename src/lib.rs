pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod rates;

pub use cache::{MemoryPageCache, PageCache};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Category, CategoryBounds, CategoryFilter, Decimal, DepositSnapshot, Market, Participant,
    TelegramId,
};
pub use engine::{LeaderboardService, RankLookup};
pub use error::AppError;
pub use rates::{ExchangeRates, HttpRateSource, MockRateSource, RateError};
