pub mod auth;
pub mod deposits;
pub mod health;
pub mod leaderboard;
pub mod participants;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::LeaderboardService;
use crate::rates::ExchangeRates;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub leaderboard: Arc<LeaderboardService>,
    pub rates: Arc<dyn ExchangeRates>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        leaderboard: Arc<LeaderboardService>,
        rates: Arc<dyn ExchangeRates>,
    ) -> Self {
        Self {
            repo,
            config,
            leaderboard,
            rates,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/leaderboard", get(leaderboard::get_leaderboard))
        .route(
            "/v1/deposits",
            post(deposits::submit_deposit).get(deposits::get_deposit_history),
        )
        .route("/v1/participants", post(participants::register))
        .route("/v1/participants/me", patch(participants::update_profile))
        .layer(cors)
        .with_state(state)
}
