use axum::http::StatusCode;
use chrono::{Duration, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use traderank::api::{self, AppState};
use traderank::cache::MemoryPageCache;
use traderank::config::Config;
use traderank::db::init_db;
use traderank::domain::{CategoryBounds, Decimal};
use traderank::rates::{ExchangeRates, MockRateSource};
use traderank::{LeaderboardService, Repository};

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn test_config() -> Config {
    Config {
        port: 0,
        database_path: ":memory:".to_string(),
        rates_api_url: "http://example.invalid/daily.json".to_string(),
        base_currency: "RUB".to_string(),
        category_bounds: CategoryBounds::new(dec("70000"), dec("250000")).unwrap(),
        cache_ttl_secs: 60,
        tz_offset_hours: 3,
        contest_start: Utc::now() - Duration::days(10),
        contest_end: Utc::now() + Duration::days(10),
    }
}

async fn setup_test_app(rates: Arc<dyn ExchangeRates>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");

    let repo = Arc::new(Repository::new(pool));
    let config = test_config();
    let cache = Arc::new(MemoryPageCache::new(config.cache_ttl_secs));
    let leaderboard = Arc::new(LeaderboardService::new(repo.clone(), cache));
    let state = AppState::new(repo, config, leaderboard, rates);
    let app = api::create_router(state);

    TestApp {
        app,
        _temp: temp_dir,
    }
}

fn register_body(initial_deposit: f64, currency: &str) -> serde_json::Value {
    serde_json::json!({
        "displayName": "trader",
        "market": "stocks",
        "instruments": ["SBER", "GAZP"],
        "initialDeposit": initial_deposit,
        "currency": currency,
    })
}

async fn request(
    app: axum::Router,
    method: &str,
    uri: &str,
    telegram_id: Option<i64>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(id) = telegram_id {
        builder = builder.header("x-telegram-id", id.to_string());
    }

    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_registration_classifies_base_currency_deposit() {
    let test_app = setup_test_app(Arc::new(MockRateSource::new())).await;

    // 100000 RUB under a 70000/250000 split lands in bracket 2.
    let (status, v) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(100000.0, "RUB")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v["telegramId"], 1);
    assert_eq!(v["depositCategory"], 2);
    assert_eq!(v["market"], "stocks");
    assert_eq!(v["instruments"], serde_json::json!(["SBER", "GAZP"]));
}

#[tokio::test]
async fn test_registration_bracket_boundaries() {
    let test_app = setup_test_app(Arc::new(MockRateSource::new())).await;

    let cases = [
        (1, 69999.0, 1),
        (2, 70000.0, 2),
        (3, 250000.0, 3),
    ];
    for (id, amount, expected) in cases {
        let (status, v) = request(
            test_app.app.clone(),
            "POST",
            "/v1/participants",
            Some(id),
            Some(register_body(amount, "RUB")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(v["depositCategory"], expected, "amount {}", amount);
    }
}

#[tokio::test]
async fn test_registration_converts_foreign_currency_once() {
    let rates = MockRateSource::new().with_rate("USD", "RUB", dec("90"));
    let test_app = setup_test_app(Arc::new(rates)).await;

    // 1000 USD * 90 = 90000 RUB -> bracket 2
    let (status, v) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(1000.0, "USD")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v["depositCategory"], 2);
    assert_eq!(v["currency"], "USD");
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let test_app = setup_test_app(Arc::new(MockRateSource::new())).await;

    let (status, _) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(100000.0, "RUB")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(50000.0, "RUB")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The original registration is untouched.
    let (_, v) = request(
        test_app.app.clone(),
        "GET",
        "/v1/leaderboard?userId=1",
        None,
        None,
    )
    .await;
    assert_eq!(v["currentUser"]["depositCategory"], 2);
}

#[tokio::test]
async fn test_rate_failure_blocks_registration_as_retryable() {
    let test_app = setup_test_app(Arc::new(MockRateSource::failing())).await;

    let (status, _) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(1000.0, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Nothing was persisted with a guessed bracket.
    let (_, v) = request(test_app.app.clone(), "GET", "/v1/leaderboard", None, None).await;
    assert_eq!(v["totalParticipants"], 0);
}

#[tokio::test]
async fn test_registration_validation() {
    let test_app = setup_test_app(Arc::new(MockRateSource::new())).await;

    let mut empty_name = register_body(100000.0, "RUB");
    empty_name["displayName"] = serde_json::json!("  ");
    let (status, v) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(empty_name),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["field"], "displayName");

    let mut no_instruments = register_body(100000.0, "RUB");
    no_instruments["instruments"] = serde_json::json!([" ", ""]);
    let (status, v) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(no_instruments),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["field"], "instruments");

    // Zero initial deposit would be a zero ranking baseline; rejected.
    let (status, v) = request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(0.0, "RUB")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["field"], "initialDeposit");
}

#[tokio::test]
async fn test_profile_update_changes_display_name_only() {
    let test_app = setup_test_app(Arc::new(MockRateSource::new())).await;

    request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(100000.0, "RUB")),
    )
    .await;

    let (status, v) = request(
        test_app.app.clone(),
        "PATCH",
        "/v1/participants/me",
        Some(1),
        Some(serde_json::json!({"displayName": "renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["displayName"], "renamed");
    // Immutable registration fields survive the update.
    assert_eq!(v["depositCategory"], 2);
    assert_eq!(v["market"], "stocks");
}

#[tokio::test]
async fn test_profile_update_requires_registration_and_fields() {
    let test_app = setup_test_app(Arc::new(MockRateSource::new())).await;

    let (status, _) = request(
        test_app.app.clone(),
        "PATCH",
        "/v1/participants/me",
        Some(1),
        Some(serde_json::json!({"displayName": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request(
        test_app.app.clone(),
        "POST",
        "/v1/participants",
        Some(1),
        Some(register_body(100000.0, "RUB")),
    )
    .await;

    let (status, _) = request(
        test_app.app.clone(),
        "PATCH",
        "/v1/participants/me",
        Some(1),
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
