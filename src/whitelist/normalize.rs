// Turns CSV rows and manual entries into submission-ready records

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Result, RowError, WhitelistError};
use crate::models::{CsvRow, Record, WindowBound};

const ADDRESS_BYTES: usize = 20;

/// Accepted calendar-date layouts, tried in order after RFC 3339.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d %Y", "%a %b %d %Y"];

/// Who is submitting and when. Both are advisory; the ledger stamps its own.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub actor: String,
    pub now: DateTime<Utc>,
}

impl Submitter {
    pub fn new(actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            now,
        }
    }
}

/// `0x` followed by 20 hex-encoded bytes.
pub fn validate_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let invalid = || WhitelistError::InvalidAddress {
        address: address.to_string(),
    };
    let hex_part = trimmed.strip_prefix("0x").ok_or_else(invalid)?;
    let bytes = hex::decode(hex_part).map_err(|_| invalid())?;
    if bytes.len() != ADDRESS_BYTES {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

/// Parse a window bound as a calendar date. Dates land on midnight UTC.
pub fn parse_bound(raw: &str) -> Result<WindowBound> {
    let value = raw.trim();
    let unparseable = || WhitelistError::UnparseableDate {
        value: raw.to_string(),
    };
    if value.is_empty() {
        return Err(unparseable());
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(WindowBound::from_timestamp(ts.with_timezone(&Utc)));
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(unparseable)?;
            return Ok(WindowBound::from_timestamp(midnight.and_utc()));
        }
    }

    // Numeric forms: `0` is the revocation sentinel, four digits name a year.
    if value == "0" {
        return Ok(WindowBound::EpochOrigin);
    }
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = value.parse().map_err(|_| unparseable())?;
        let new_year = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(unparseable)?;
        return Ok(WindowBound::from_timestamp(new_year.and_utc()));
    }

    Err(unparseable())
}

/// Resolve an `Unparsed` bound in place; other states pass through.
pub fn resolve_bound(bound: WindowBound) -> Result<WindowBound> {
    match bound {
        WindowBound::Unparsed(raw) => parse_bound(&raw),
        resolved => Ok(resolved),
    }
}

pub fn normalize_entry(
    address: &str,
    window_start_raw: &str,
    window_end_raw: &str,
    submitter: &Submitter,
) -> Result<Record> {
    build_record(
        address,
        WindowBound::Unparsed(window_start_raw.to_string()),
        WindowBound::Unparsed(window_end_raw.to_string()),
        submitter,
    )
}

pub fn normalize_row(row: &CsvRow, submitter: &Submitter) -> Result<Record> {
    build_record(
        &row.address,
        WindowBound::Unparsed(row.window_start_raw.clone()),
        WindowBound::Unparsed(row.window_end_raw.clone()),
        submitter,
    )
}

fn build_record(
    address: &str,
    window_start: WindowBound,
    window_end: WindowBound,
    submitter: &Submitter,
) -> Result<Record> {
    let address = validate_address(address)?;
    let window_start = resolve_bound(window_start)?;
    let window_end = resolve_bound(window_end)?;

    Ok(Record {
        id: Uuid::new_v4().to_string(),
        address,
        added_at: submitter.now,
        added_by: Some(submitter.actor.clone()),
        window_start,
        window_end,
    })
}

/// Normalize every row, reporting all failures rather than the first one.
pub fn normalize_rows(rows: &[CsvRow], submitter: &Submitter) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for row in rows {
        match normalize_row(row, submitter) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push(RowError::new(row.line, &e)),
        }
    }

    if rejected.is_empty() {
        Ok(records)
    } else {
        Err(WhitelistError::Rejected { rows: rejected })
    }
}

/// Records that revoke access: both bounds collapse to the epoch origin.
pub fn removal_records(addresses: &[String], submitter: &Submitter) -> Result<Vec<Record>> {
    collect_for_addresses(addresses, |address| {
        build_record(
            address,
            WindowBound::EpochOrigin,
            WindowBound::EpochOrigin,
            submitter,
        )
    })
}

/// One window applied to many addresses.
pub fn edit_records(
    addresses: &[String],
    window_start_raw: &str,
    window_end_raw: &str,
    submitter: &Submitter,
) -> Result<Vec<Record>> {
    // A bad date fails every row the same way, so report it once.
    let window_start = parse_bound(window_start_raw)?;
    let window_end = parse_bound(window_end_raw)?;
    collect_for_addresses(addresses, |address| {
        build_record(address, window_start.clone(), window_end.clone(), submitter)
    })
}

fn collect_for_addresses<F>(addresses: &[String], mut build: F) -> Result<Vec<Record>>
where
    F: FnMut(&str) -> Result<Record>,
{
    let mut records = Vec::with_capacity(addresses.len());
    let mut rejected = Vec::new();
    for (idx, address) in addresses.iter().enumerate() {
        match build(address) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push(RowError::new(idx + 1, &e)),
        }
    }
    if rejected.is_empty() {
        Ok(records)
    } else {
        Err(WhitelistError::Rejected { rows: rejected })
    }
}
