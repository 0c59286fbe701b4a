// Whitelist models shared by the engine, the event store and the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RowError, WhitelistError};

/// One bound of an access window.
///
/// A resolved timestamp of zero is never stored as `Resolved`; use
/// [`WindowBound::from_timestamp`] so the revocation sentinel stays
/// `EpochOrigin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum WindowBound {
    Unparsed(String),
    Resolved(DateTime<Utc>),
    EpochOrigin,
}

impl WindowBound {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        if ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0 {
            WindowBound::EpochOrigin
        } else {
            WindowBound::Resolved(ts)
        }
    }

    /// Ledger events carry window bounds as unix seconds.
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Self::from_timestamp)
    }

    pub fn is_epoch_origin(&self) -> bool {
        matches!(self, WindowBound::EpochOrigin)
    }

    /// An `Unparsed` bound has no timestamp until it is resolved.
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        match self {
            WindowBound::Resolved(ts) => Ok(*ts),
            WindowBound::EpochOrigin => Ok(DateTime::<Utc>::default()),
            WindowBound::Unparsed(raw) => Err(WhitelistError::UnparseableDate { value: raw.clone() }),
        }
    }

    pub fn unix_seconds(&self) -> Result<i64> {
        self.timestamp().map(|ts| ts.timestamp())
    }
}

/// One historical change to an address's access window, as logged by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub address: String,
    pub added_at: DateTime<Utc>,
    pub added_by: Option<String>,
    pub window_start: WindowBound,
    pub window_end: WindowBound,
}

/// Whitelist modification event stored in database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEvent {
    pub token: String,
    pub investor: String,
    pub added_by: Option<String>,
    pub added_at: DateTime<Utc>,
    pub from_time: i64,
    pub to_time: i64,
    pub tx_digest: String,
    pub event_seq: String,
}

impl WhitelistEvent {
    pub fn to_raw_event(&self) -> Option<RawEvent> {
        Some(RawEvent {
            address: self.investor.clone(),
            added_at: self.added_at,
            added_by: self.added_by.clone(),
            window_start: WindowBound::from_unix_seconds(self.from_time)?,
            window_end: WindowBound::from_unix_seconds(self.to_time)?,
        })
    }
}

/// Current whitelist entry for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub address: String,
    pub added_at: DateTime<Utc>,
    pub added_by: Option<String>,
    pub window_start: WindowBound,
    pub window_end: WindowBound,
}

/// A record prepared for the table, dates rendered without time of day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub id: String,
    pub address: String,
    pub added_at: Option<String>,
    pub added_by: Option<String>,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
}

pub type Page = Vec<DisplayRecord>;

/// Candidate row pulled out of an uploaded CSV, nothing validated yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub line: usize,
    pub address: String,
    pub window_start_raw: String,
    pub window_end_raw: String,
}

/// Ledger acknowledgement for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
}

/// Request for the paginated whitelist of a token
#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub token: String,
    #[serde(default)]
    pub calendar_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub calendar_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub list_length: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub pages: Vec<Page>,
    pub page_count: usize,
    pub record_count: usize,
}

/// Parsed CSV upload, columns kept parallel
#[derive(Debug, Serialize)]
pub struct CsvUploadResponse {
    pub message: String,
    pub addresses: Vec<String>,
    pub sell: Vec<String>,
    pub buy: Vec<String>,
    pub rejected: Vec<RowError>,
}

/// A manually entered (or CSV-derived) whitelist entry
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRequest {
    pub address: String,
    pub window_start: String,
    pub window_end: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub entries: Vec<EntryRequest>,
}

/// Apply one access window to many addresses
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub addresses: Vec<String>,
    pub window_start: String,
    pub window_end: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub message: String,
    pub transaction_hash: String,
    pub submitted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timestamp_is_epoch_origin() {
        assert_eq!(WindowBound::from_unix_seconds(0), Some(WindowBound::EpochOrigin));
        assert!(WindowBound::from_timestamp(DateTime::<Utc>::default()).is_epoch_origin());
    }

    #[test]
    fn test_nonzero_timestamp_is_resolved() {
        let bound = WindowBound::from_unix_seconds(1_577_836_800).unwrap();
        assert!(!bound.is_epoch_origin());
        assert_eq!(bound.unix_seconds().ok(), Some(1_577_836_800));
    }

    #[test]
    fn test_stored_event_to_raw_event() {
        let stored = WhitelistEvent {
            token: "ACME".into(),
            investor: "0xabc".into(),
            added_by: None,
            added_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            from_time: 0,
            to_time: 1_800_000_000,
            tx_digest: "d".into(),
            event_seq: "0".into(),
        };
        let raw = stored.to_raw_event().unwrap();
        assert_eq!(raw.address, "0xabc");
        assert!(raw.window_start.is_epoch_origin());
        assert_eq!(raw.window_end.unix_seconds().ok(), Some(1_800_000_000));

        let out_of_range = WhitelistEvent {
            to_time: i64::MAX,
            ..stored
        };
        assert!(out_of_range.to_raw_event().is_none());
    }

    #[test]
    fn test_unparsed_has_no_timestamp() {
        let bound = WindowBound::Unparsed("next tuesday".to_string());
        assert!(matches!(
            bound.timestamp(),
            Err(WhitelistError::UnparseableDate { value }) if value == "next tuesday"
        ));
        assert!(bound.unix_seconds().is_err());
        assert!(!bound.is_epoch_origin());
    }
}
