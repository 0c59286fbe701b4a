// Mirrors the registry's whitelist events from the ledger into Postgres

use crate::database::{Database, DbPool};
use crate::models::WhitelistEvent;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// No successful poll for this long and `/health` reports the indexer stalled.
const STALL_AFTER_SECS: i64 = 60;
const BATCH_SIZE: u64 = 50;
const EVENT_MODULE: &str = "whitelist";
const WHITELIST_MODIFIED: &str = "WhitelistModified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventId {
    pub tx_digest: String,
    pub event_seq: String,
}

impl EventId {
    pub fn to_cursor(&self) -> String {
        format!("{}:{}", self.tx_digest, self.event_seq)
    }

    pub fn from_cursor(cursor: &str) -> Option<Self> {
        let (tx_digest, event_seq) = cursor.split_once(':')?;
        if tx_digest.is_empty() || event_seq.is_empty() || event_seq.contains(':') {
            return None;
        }
        Some(EventId {
            tx_digest: tx_digest.to_string(),
            event_seq: event_seq.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub data: Vec<LedgerEvent>,
    pub next_cursor: Option<EventId>,
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub parsed_json: Value,
    pub timestamp_ms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Where the indexer keeps its resume point.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load_cursor(&self) -> Result<Option<String>>;
    async fn save_cursor(&self, cursor: &str) -> Result<()>;
}

#[async_trait]
impl CursorStore for DbPool {
    async fn load_cursor(&self) -> Result<Option<String>> {
        Database::load_cursor(self).await
    }

    async fn save_cursor(&self, cursor: &str) -> Result<()> {
        Database::save_cursor(self, cursor).await
    }
}

/// Persist `next` and move to it. When the save fails the old cursor stays,
/// so the same page is fetched again; replayed events are ignored on insert.
pub async fn advance_cursor<S: CursorStore + ?Sized>(
    store: &S,
    cursor: &mut Option<EventId>,
    next: EventId,
) -> bool {
    match store.save_cursor(&next.to_cursor()).await {
        Ok(()) => {
            *cursor = Some(next);
            true
        }
        Err(e) => {
            error!("Failed to save indexer cursor {}: {}", next.to_cursor(), e);
            false
        }
    }
}

/// Indexer liveness, shared with the health endpoint.
#[derive(Debug, Default)]
pub struct IndexerStatus {
    running: AtomicBool,
    last_poll_ms: AtomicI64,
}

impl IndexerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the indexer running until the returned guard drops.
    pub fn enter(&self) -> RunningGuard<'_> {
        self.running.store(true, Ordering::Relaxed);
        RunningGuard(self)
    }

    pub fn record_poll(&self, at: DateTime<Utc>) {
        self.last_poll_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        match self.last_poll_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::<Utc>::from_timestamp_millis(ms),
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> &'static str {
        if !self.running.load(Ordering::Relaxed) {
            return "stopped";
        }
        match self.last_poll() {
            None => "starting",
            Some(at) if (now - at).num_seconds() > STALL_AFTER_SECS => "stalled",
            Some(_) => "running",
        }
    }
}

pub struct RunningGuard<'a>(&'a IndexerStatus);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Relaxed);
    }
}

pub struct Indexer {
    http_client: HttpClient,
    rpc_url: String,
    package_id: String,
    pool: DbPool,
    status: Arc<IndexerStatus>,
}

impl Indexer {
    pub fn new(rpc_url: String, package_id: String, pool: DbPool) -> Self {
        Self {
            http_client: HttpClient::new(),
            rpc_url,
            package_id,
            pool,
            status: Arc::new(IndexerStatus::new()),
        }
    }

    pub fn status(&self) -> Arc<IndexerStatus> {
        self.status.clone()
    }

    /// Poll forever. Database and RPC failures are logged and retried on the
    /// next tick; only successful polls count towards liveness.
    pub async fn run(&self) {
        let _running = self.status.enter();
        info!("Starting whitelist indexer for package {}", self.package_id);

        let mut cursor = loop {
            match self.pool.load_cursor().await {
                Ok(saved) => break saved.and_then(|c| EventId::from_cursor(&c)),
                Err(e) => {
                    error!("Failed to load indexer cursor: {}", e);
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        };

        loop {
            match self.fetch_and_store_events(cursor.as_ref()).await {
                Ok(Some(page)) => {
                    let saved = match page.next_cursor {
                        Some(next) => advance_cursor(&self.pool, &mut cursor, next).await,
                        None => true,
                    };
                    if saved {
                        self.status.record_poll(Utc::now());
                        // Drain backlog before sleeping.
                        if page.has_next_page {
                            continue;
                        }
                    }
                }
                Ok(None) => self.status.record_poll(Utc::now()),
                Err(e) => {
                    error!("Error indexing whitelist events: {}", e);
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn fetch_and_store_events(&self, cursor: Option<&EventId>) -> Result<Option<PageSummary>> {
        let filter = json!({
            "MoveEventModule": {
                "package": self.package_id,
                "module": EVENT_MODULE
            }
        });

        let cursor_value = cursor.map(|c| json!(c)).unwrap_or(Value::Null);

        let payload = json!({
            "jsonrpc": "2.0",
            "method": "suix_queryEvents",
            "params": [filter, cursor_value, BATCH_SIZE, false],
            "id": 1
        });

        let resp = self
            .http_client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?;

        let rpc_resp: RpcResponse<EventPage> = resp.json().await?;

        if let Some(error) = rpc_resp.error {
            return Err(anyhow!("RPC error: {} ({})", error.message, error.code));
        }

        let event_page = rpc_resp
            .result
            .ok_or_else(|| anyhow!("No result in RPC response"))?;

        if event_page.data.is_empty() {
            return Ok(None);
        }

        info!("Fetched {} ledger events", event_page.data.len());

        for event in &event_page.data {
            match decode_event(event) {
                Ok(Some(whitelist_event)) => {
                    match Database::insert_event(&self.pool, &whitelist_event).await? {
                        Some(id) => debug!(
                            "Stored whitelist event {} for investor {} on token {}",
                            id, whitelist_event.investor, whitelist_event.token
                        ),
                        None => debug!("Event {} already stored", event.id.to_cursor()),
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to decode event {:?}: {}", event.id, e),
            }
        }

        Ok(Some(PageSummary {
            next_cursor: event_page.next_cursor,
            has_next_page: event_page.has_next_page,
        }))
    }
}

struct PageSummary {
    next_cursor: Option<EventId>,
    has_next_page: bool,
}

/// Decode a `WhitelistModified` event. Other event kinds yield `None`.
pub fn decode_event(event: &LedgerEvent) -> Result<Option<WhitelistEvent>> {
    let event_name = event
        .event_type
        .rsplit("::")
        .next()
        .ok_or_else(|| anyhow!("Invalid event type"))?;

    if event_name != WHITELIST_MODIFIED {
        debug!("Ignoring event type: {}", event_name);
        return Ok(None);
    }

    let json = &event.parsed_json;
    let token = json_str(json, "token")?;
    let investor = json_str(json, "investor")?;
    let added_by = json["added_by"].as_str().map(str::to_string);
    let from_time = json_i64(json, "from_time")?;
    let to_time = json_i64(json, "to_time")?;

    // The ledger's clock is authoritative for last-write-wins.
    let ts_millis: i64 = event
        .timestamp_ms
        .as_deref()
        .ok_or_else(|| anyhow!("Event has no timestamp"))?
        .parse()?;
    let added_at = DateTime::<Utc>::from_timestamp_millis(ts_millis)
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", ts_millis))?;

    Ok(Some(WhitelistEvent {
        token,
        investor,
        added_by,
        added_at,
        from_time,
        to_time,
        tx_digest: event.id.tx_digest.clone(),
        event_seq: event.id.event_seq.clone(),
    }))
}

fn json_str(json: &Value, field: &str) -> Result<String> {
    json[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Missing field '{}'", field))
}

/// u64 fields arrive as decimal strings; accept plain numbers too.
fn json_i64(json: &Value, field: &str) -> Result<i64> {
    match &json[field] {
        Value::String(s) => Ok(s.parse()?),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| anyhow!("Field '{}' out of range", field)),
        _ => Err(anyhow!("Missing field '{}'", field)),
    }
}
