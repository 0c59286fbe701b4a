// Database layer for the whitelist event log

use crate::error::WhitelistError;
use crate::models::{RawEvent, WhitelistEvent};
use crate::whitelist::EventSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, Pool, Postgres};
use tracing::{info, warn};

pub type DbPool = Pool<Postgres>;

pub struct Database;

impl Database {
    /// Initialize database connection pool
    pub async fn init(database_url: &str) -> Result<DbPool> {
        info!("Connecting to database: {}", database_url);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(pool)
    }

    /// Append a whitelist event; replays of the same ledger event are ignored
    pub async fn insert_event(pool: &DbPool, event: &WhitelistEvent) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO whitelist_events (
                token, investor, added_by, added_at_ms,
                from_time, to_time, transaction_digest, event_seq
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (transaction_digest, event_seq) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&event.token)
        .bind(&event.investor)
        .bind(&event.added_by)
        .bind(event.added_at.timestamp_millis())
        .bind(event.from_time)
        .bind(event.to_time)
        .bind(&event.tx_digest)
        .bind(&event.event_seq)
        .fetch_optional(pool)
        .await?;

        Ok(id)
    }

    /// Full event log for a token, in the order the indexer appended it
    pub async fn events_for_token(pool: &DbPool, token: &str) -> Result<Vec<WhitelistEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT token, investor, added_by, added_at_ms,
                   from_time, to_time, transaction_digest, event_seq
            FROM whitelist_events
            WHERE token = $1
            ORDER BY id ASC
            "#,
        )
        .bind(token)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().filter_map(EventRow::into_event).collect())
    }

    pub async fn load_cursor(pool: &DbPool) -> Result<Option<String>> {
        let cursor = sqlx::query_scalar::<_, String>("SELECT cursor FROM indexer_state WHERE id = 1")
            .fetch_optional(pool)
            .await?;
        Ok(cursor)
    }

    pub async fn save_cursor(pool: &DbPool, cursor: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO indexer_state (id, cursor, updated_at)
             VALUES (1, $1, NOW())
             ON CONFLICT (id) DO UPDATE SET cursor = $1, updated_at = NOW()",
        )
        .bind(cursor)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    token: String,
    investor: String,
    added_by: Option<String>,
    added_at_ms: i64,
    from_time: i64,
    to_time: i64,
    transaction_digest: String,
    event_seq: String,
}

impl EventRow {
    fn into_event(self) -> Option<WhitelistEvent> {
        let Some(added_at) = DateTime::<Utc>::from_timestamp_millis(self.added_at_ms) else {
            warn!(
                "Skipping stored event {}:{} with out-of-range timestamp {}",
                self.transaction_digest, self.event_seq, self.added_at_ms
            );
            return None;
        };
        Some(WhitelistEvent {
            token: self.token,
            investor: self.investor,
            added_by: self.added_by,
            added_at,
            from_time: self.from_time,
            to_time: self.to_time,
            tx_digest: self.transaction_digest,
            event_seq: self.event_seq,
        })
    }
}

/// Postgres-backed snapshot of the ledger's whitelist event log
#[derive(Clone)]
pub struct EventStore {
    pool: DbPool,
}

impl EventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSource for EventStore {
    async fn fetch_whitelist_events(&self, token: &str) -> crate::error::Result<Vec<RawEvent>> {
        let stored = Database::events_for_token(&self.pool, token)
            .await
            .map_err(|e| WhitelistError::EventSource(e.to_string()))?;

        Ok(stored
            .iter()
            .filter_map(|event| {
                let raw = event.to_raw_event();
                if raw.is_none() {
                    warn!(
                        "Skipping event {}:{} with out-of-range window",
                        event.tx_digest, event.event_seq
                    );
                }
                raw
            })
            .collect())
    }
}
