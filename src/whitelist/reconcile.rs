// Collapses the raw whitelist event log into one current record per address

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, WhitelistError};
use crate::models::{RawEvent, Record};

/// Exclusive `(start, end)` filter on when an event was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Calendar bounds come in pairs: both set, or neither.
    pub fn from_bounds(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>> {
        match (start, end) {
            (Some(start), Some(end)) => Ok(Some(Self::new(start, end))),
            (None, None) => Ok(None),
            _ => Err(WhitelistError::InvalidConfiguration(
                "calendar_start and calendar_end must be given together".to_string(),
            )),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start < ts && ts < self.end
    }
}

/// Merge events into records, last write wins.
///
/// Records appear in the order their address was first seen among the events
/// that pass `window`. A later event only replaces a record when its
/// `added_at` is strictly newer; ties keep the earlier event. Addresses
/// compare case-insensitively.
pub fn reconcile(events: &[RawEvent], window: Option<&TimeWindow>) -> Vec<Record> {
    let mut records: Vec<Record> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut considered = 0usize;

    for event in events {
        if let Some(window) = window {
            if !window.contains(event.added_at) {
                continue;
            }
        }
        considered += 1;

        let key = event.address.to_ascii_lowercase();
        match positions.get(&key) {
            Some(&pos) => {
                if event.added_at > records[pos].added_at {
                    records[pos] = record_from(event);
                }
            }
            None => {
                positions.insert(key, records.len());
                records.push(record_from(event));
            }
        }
    }

    debug!(
        "Reconciled {} of {} events into {} records",
        considered,
        events.len(),
        records.len()
    );
    records
}

fn record_from(event: &RawEvent) -> Record {
    Record {
        id: Uuid::new_v4().to_string(),
        address: event.address.clone(),
        added_at: event.added_at,
        added_by: event.added_by.clone(),
        window_start: event.window_start.clone(),
        window_end: event.window_end.clone(),
    }
}
