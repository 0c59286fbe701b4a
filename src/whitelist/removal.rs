// Drops revoked records and renders survivors for display

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::Result;
use crate::models::{DisplayRecord, Record, WindowBound};

/// Date-only rendering, e.g. `Wed Jan 01 2020`.
const DISPLAY_DATE_FORMAT: &str = "%a %b %d %Y";

pub fn display_date(ts: DateTime<Utc>) -> String {
    ts.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Both bounds at the epoch origin means access was revoked.
pub fn is_removed(record: &Record) -> bool {
    record.window_start.is_epoch_origin() && record.window_end.is_epoch_origin()
}

pub fn remove_revoked(records: Vec<Record>) -> Result<Vec<DisplayRecord>> {
    let total = records.len();
    let visible = records
        .into_iter()
        .filter(|record| !is_removed(record))
        .map(into_display)
        .collect::<Result<Vec<_>>>()?;

    debug!("Removed {} revoked records, {} remain", total - visible.len(), visible.len());
    Ok(visible)
}

fn into_display(record: Record) -> Result<DisplayRecord> {
    let window_start = render_bound(&record.window_start)?;
    let window_end = render_bound(&record.window_end)?;
    Ok(DisplayRecord {
        id: record.id,
        address: record.address,
        added_at: Some(display_date(record.added_at)),
        added_by: record.added_by,
        window_start: Some(window_start),
        window_end: Some(window_end),
    })
}

fn render_bound(bound: &WindowBound) -> Result<String> {
    bound.timestamp().map(display_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WhitelistError;
    use chrono::TimeZone;

    fn record(address: &str, start: WindowBound, end: WindowBound) -> Record {
        Record {
            id: format!("id-{address}"),
            address: address.to_string(),
            added_at: Utc.with_ymd_and_hms(2020, 1, 1, 15, 45, 0).unwrap(),
            added_by: Some("0xowner".to_string()),
            window_start: start,
            window_end: end,
        }
    }

    fn resolved(y: i32, m: u32, d: u32) -> WindowBound {
        WindowBound::Resolved(Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap())
    }

    #[test]
    fn test_both_bounds_at_origin_are_dropped() {
        let records = vec![
            record("gone", WindowBound::EpochOrigin, WindowBound::EpochOrigin),
            record("kept", resolved(2020, 2, 1), resolved(2020, 3, 1)),
        ];
        let visible = remove_revoked(records).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].address, "kept");
    }

    #[test]
    fn test_single_origin_bound_survives() {
        let records = vec![
            record("open_start", WindowBound::EpochOrigin, resolved(2020, 3, 1)),
            record("open_end", resolved(2020, 2, 1), WindowBound::EpochOrigin),
        ];
        let visible = remove_revoked(records).unwrap();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].window_start.as_deref(), Some("Thu Jan 01 1970"));
        assert_eq!(visible[1].window_end.as_deref(), Some("Thu Jan 01 1970"));
    }

    #[test]
    fn test_dates_render_without_time_of_day() {
        let visible =
            remove_revoked(vec![record("a", resolved(2020, 2, 1), resolved(2020, 3, 1))]).unwrap();
        let shown = &visible[0];
        assert_eq!(shown.id, "id-a");
        assert_eq!(shown.added_at.as_deref(), Some("Wed Jan 01 2020"));
        assert_eq!(shown.window_start.as_deref(), Some("Sat Feb 01 2020"));
        assert_eq!(shown.window_end.as_deref(), Some("Sun Mar 01 2020"));
        assert_eq!(shown.added_by.as_deref(), Some("0xowner"));
    }

    #[test]
    fn test_unparsed_survivor_is_rejected() {
        let records = vec![record(
            "a",
            WindowBound::Unparsed("later".into()),
            resolved(2020, 3, 1),
        )];
        assert!(matches!(
            remove_revoked(records),
            Err(WhitelistError::UnparseableDate { .. })
        ));
    }
}
