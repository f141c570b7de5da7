//! Repository layer for database operations.

use crate::domain::{
    Category, Decimal, DepositSnapshot, Market, NewParticipant, Participant, TelegramId,
};
use crate::engine::ranking::RankingInput;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

/// Repository for database operations.
///
/// The snapshot store is the single source of truth; the page cache is a
/// derived layer with no write path of its own.
pub struct Repository {
    pool: SqlitePool,
}

/// True if `err` is a SQLite unique-constraint violation.
///
/// Used to turn a duplicate registration insert into a conflict instead of
/// an internal error.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Insert a new participant row.
    ///
    /// # Errors
    /// Returns the raw sqlx error; a duplicate `telegram_id` surfaces as a
    /// unique-constraint violation (see [`is_unique_violation`]).
    pub async fn insert_participant(
        &self,
        new: &NewParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let instruments_json = serde_json::to_string(&new.instruments)
            .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO participants (
                telegram_id, display_name, avatar_url, market, instruments,
                initial_deposit, currency, category, registered_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.telegram_id.as_i64())
        .bind(&new.display_name)
        .bind(&new.avatar_url)
        .bind(new.market.as_str())
        .bind(&instruments_json)
        .bind(new.initial_deposit.to_canonical_string())
        .bind(&new.currency)
        .bind(new.category.as_u8() as i64)
        .bind(new.registered_at)
        .execute(&self.pool)
        .await?;

        Ok(Participant {
            id: result.last_insert_rowid(),
            telegram_id: new.telegram_id,
            display_name: new.display_name.clone(),
            avatar_url: new.avatar_url.clone(),
            market: new.market,
            instruments: new.instruments.clone(),
            initial_deposit: new.initial_deposit,
            currency: new.currency.clone(),
            category: Some(new.category),
            registered_at: new.registered_at,
        })
    }

    /// Fetch a participant by Telegram id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_participant(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, telegram_id, display_name, avatar_url, market, instruments,
                   initial_deposit, currency, category, registered_at
            FROM participants
            WHERE telegram_id = ?
            "#,
        )
        .bind(telegram_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| participant_from_row(&r)).transpose()
    }

    /// Update a participant's mutable profile fields. Absent fields are left
    /// unchanged. Returns false if no participant row matched.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update_profile(
        &self,
        telegram_id: TelegramId,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET display_name = COALESCE(?, display_name),
                avatar_url = COALESCE(?, avatar_url)
            WHERE telegram_id = ?
            "#,
        )
        .bind(display_name)
        .bind(avatar_url)
        .bind(telegram_id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Upsert one deposit snapshot atomically.
    ///
    /// At most one row exists per (participant, date); a second write for
    /// the same date overwrites the value. Concurrent writers serialize on
    /// the unique constraint, last committed write wins.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_snapshot(
        &self,
        participant_id: i64,
        snapshot_date: NaiveDate,
        value: Decimal,
        updated_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO deposit_snapshots (participant_id, snapshot_date, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(participant_id, snapshot_date) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(participant_id)
        .bind(snapshot_date.to_string())
        .bind(value.to_canonical_string())
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All snapshots for one participant, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn snapshots_for(
        &self,
        participant_id: i64,
    ) -> Result<Vec<DepositSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT participant_id, snapshot_date, value, updated_at
            FROM deposit_snapshots
            WHERE participant_id = ?
            ORDER BY snapshot_date ASC
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DepositSnapshot {
                    participant_id: row.get("participant_id"),
                    snapshot_date: parse_date(&row.get::<String, _>("snapshot_date"))?,
                    value: parse_decimal(&row.get::<String, _>("value"))?,
                    updated_at: row.get("updated_at"),
                })
            })
            .collect()
    }

    /// One ranking input per participant passing the category filter, each
    /// carrying its latest snapshot value at or before `as_of` (if any).
    ///
    /// This is the flat query feeding the in-process ranking pipeline; no
    /// ordering or pagination happens at the storage layer.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn ranking_inputs(
        &self,
        category: Option<Category>,
        as_of: NaiveDate,
    ) -> Result<Vec<RankingInput>, sqlx::Error> {
        let (sql, binds_category) = if category.is_some() {
            (
                r#"
                SELECT p.id, p.telegram_id, p.display_name, p.avatar_url, p.market,
                       p.instruments, p.initial_deposit, p.category, p.registered_at,
                       (SELECT s.value FROM deposit_snapshots s
                        WHERE s.participant_id = p.id AND s.snapshot_date <= ?
                        ORDER BY s.snapshot_date DESC LIMIT 1) AS snapshot_value
                FROM participants p
                WHERE p.category = ?
                "#,
                true,
            )
        } else {
            (
                r#"
                SELECT p.id, p.telegram_id, p.display_name, p.avatar_url, p.market,
                       p.instruments, p.initial_deposit, p.category, p.registered_at,
                       (SELECT s.value FROM deposit_snapshots s
                        WHERE s.participant_id = p.id AND s.snapshot_date <= ?
                        ORDER BY s.snapshot_date DESC LIMIT 1) AS snapshot_value
                FROM participants p
                "#,
                false,
            )
        };

        let mut query = sqlx::query(sql).bind(as_of.to_string());
        if binds_category {
            query = query.bind(
                category
                    .expect("binds_category implies category is Some")
                    .as_u8() as i64,
            );
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let snapshot_value: Option<String> = row.get("snapshot_value");
                Ok(RankingInput {
                    participant_id: row.get("id"),
                    telegram_id: TelegramId::new(row.get("telegram_id")),
                    display_name: row.get("display_name"),
                    avatar_url: row.get("avatar_url"),
                    market: parse_market(&row.get::<String, _>("market"))?,
                    instruments: parse_instruments(&row.get::<String, _>("instruments"))?,
                    category: parse_category(row.get("category"))?,
                    initial_deposit: parse_decimal(&row.get::<String, _>("initial_deposit"))?,
                    snapshot_value: snapshot_value.as_deref().map(parse_decimal).transpose()?,
                    registered_at: row.get("registered_at"),
                })
            })
            .collect()
    }
}

fn participant_from_row(row: &SqliteRow) -> Result<Participant, sqlx::Error> {
    Ok(Participant {
        id: row.get("id"),
        telegram_id: TelegramId::new(row.get("telegram_id")),
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
        market: parse_market(&row.get::<String, _>("market"))?,
        instruments: parse_instruments(&row.get::<String, _>("instruments"))?,
        initial_deposit: parse_decimal(&row.get::<String, _>("initial_deposit"))?,
        currency: row.get("currency"),
        category: parse_category(row.get("category"))?,
        registered_at: row.get("registered_at"),
    })
}

// Stored values are written exclusively by this repository; a parse failure
// here means the store violated its own invariants, so it surfaces as an
// error instead of a silent default.

fn parse_market(raw: &str) -> Result<Market, sqlx::Error> {
    Market::from_str(raw)
        .map_err(|_| sqlx::Error::Decode(format!("unknown market code: {}", raw).into()))
}

fn parse_category(raw: Option<i64>) -> Result<Option<Category>, sqlx::Error> {
    raw.map(|v| {
        u8::try_from(v)
            .ok()
            .and_then(|v| Category::try_from(v).ok())
            .ok_or_else(|| sqlx::Error::Decode(format!("invalid category code: {}", v).into()))
    })
    .transpose()
}

fn parse_decimal(raw: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str_canonical(raw)
        .map_err(|e| sqlx::Error::Decode(format!("invalid decimal {}: {}", raw, e).into()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::from_str(raw)
        .map_err(|e| sqlx::Error::Decode(format!("invalid date {}: {}", raw, e).into()))
}

fn parse_instruments(raw: &str) -> Result<Vec<String>, sqlx::Error> {
    serde_json::from_str(raw)
        .map_err(|e| sqlx::Error::Decode(format!("invalid instruments json: {}", e).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn new_participant(telegram_id: i64, category: Category, registered_at: i64) -> NewParticipant {
        NewParticipant {
            telegram_id: TelegramId::new(telegram_id),
            display_name: format!("trader{}", telegram_id),
            avatar_url: None,
            market: Market::Stocks,
            instruments: vec!["SBER".to_string(), "GAZP".to_string()],
            initial_deposit: Decimal::from_str("100000").unwrap(),
            currency: "RUB".to_string(),
            category,
            registered_at,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_participant() {
        let (repo, _temp) = setup_test_db().await;

        let inserted = repo
            .insert_participant(&new_participant(100, Category::Two, 1000))
            .await
            .expect("insert failed");
        assert!(inserted.id > 0);

        let fetched = repo
            .get_participant(TelegramId::new(100))
            .await
            .expect("query failed")
            .expect("participant present");
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.category, Some(Category::Two));
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_unique_violation() {
        let (repo, _temp) = setup_test_db().await;

        repo.insert_participant(&new_participant(100, Category::One, 1000))
            .await
            .expect("first insert failed");

        let err = repo
            .insert_participant(&new_participant(100, Category::Three, 2000))
            .await
            .expect_err("duplicate insert should fail");
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_participant(&new_participant(100, Category::One, 1000))
            .await
            .unwrap();

        let updated = repo
            .update_profile(TelegramId::new(100), Some("renamed"), None)
            .await
            .expect("update failed");
        assert!(updated);

        let fetched = repo
            .get_participant(TelegramId::new(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.display_name, "renamed");
        assert_eq!(fetched.avatar_url, None);

        let missing = repo
            .update_profile(TelegramId::new(999), Some("ghost"), None)
            .await
            .unwrap();
        assert!(!missing);
    }

    #[tokio::test]
    async fn test_upsert_snapshot_idempotent_and_overwriting() {
        let (repo, _temp) = setup_test_db().await;
        let p = repo
            .insert_participant(&new_participant(100, Category::Two, 1000))
            .await
            .unwrap();

        let day = date("2025-07-02");
        let v1 = Decimal::from_str("112000").unwrap();
        repo.upsert_snapshot(p.id, day, v1, 10).await.unwrap();
        repo.upsert_snapshot(p.id, day, v1, 20).await.unwrap();

        let snapshots = repo.snapshots_for(p.id).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].value, v1);

        // A different value for the same date overwrites, never appends.
        let v2 = Decimal::from_str("120000").unwrap();
        repo.upsert_snapshot(p.id, day, v2, 30).await.unwrap();

        let snapshots = repo.snapshots_for(p.id).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].value, v2);
        assert_eq!(snapshots[0].updated_at, 30);
    }

    #[tokio::test]
    async fn test_ranking_inputs_latest_at_or_before() {
        let (repo, _temp) = setup_test_db().await;
        let p = repo
            .insert_participant(&new_participant(100, Category::Two, 1000))
            .await
            .unwrap();

        repo.upsert_snapshot(p.id, date("2025-07-01"), Decimal::from_str("105000").unwrap(), 1)
            .await
            .unwrap();
        repo.upsert_snapshot(p.id, date("2025-07-03"), Decimal::from_str("112000").unwrap(), 2)
            .await
            .unwrap();

        // as-of between the two snapshots resolves to the earlier one
        let inputs = repo.ranking_inputs(None, date("2025-07-02")).await.unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(
            inputs[0].snapshot_value.unwrap().to_canonical_string(),
            "105000"
        );

        // as-of after both resolves to the latest
        let inputs = repo.ranking_inputs(None, date("2025-07-05")).await.unwrap();
        assert_eq!(
            inputs[0].snapshot_value.unwrap().to_canonical_string(),
            "112000"
        );

        // as-of before any snapshot leaves the value unset
        let inputs = repo.ranking_inputs(None, date("2025-06-30")).await.unwrap();
        assert!(inputs[0].snapshot_value.is_none());
    }

    #[tokio::test]
    async fn test_ranking_inputs_category_filter() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_participant(&new_participant(1, Category::One, 10))
            .await
            .unwrap();
        repo.insert_participant(&new_participant(2, Category::Two, 20))
            .await
            .unwrap();
        repo.insert_participant(&new_participant(3, Category::Two, 30))
            .await
            .unwrap();

        let all = repo
            .ranking_inputs(None, date("2025-07-01"))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let two = repo
            .ranking_inputs(Some(Category::Two), date("2025-07-01"))
            .await
            .unwrap();
        assert_eq!(two.len(), 2);
        assert!(two.iter().all(|i| i.category == Some(Category::Two)));

        let three = repo
            .ranking_inputs(Some(Category::Three), date("2025-07-01"))
            .await
            .unwrap();
        assert!(three.is_empty());
    }
}
