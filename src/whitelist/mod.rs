//! Whitelist reconciliation and pagination engine
//!
//! The view of a token's whitelist is rebuilt from scratch on every call:
//!
//! - `reconcile`: raw event log → one record per address (last write wins)
//! - `removal`: drop revoked records, render dates for display
//! - `paginate`: chunk into pages, never returning zero pages
//!
//! Uploads go through `csv` and `normalize` before they are submitted.

pub mod csv;
pub mod normalize;
pub mod paginate;
pub mod reconcile;
pub mod removal;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::models::{Page, RawEvent};

pub use csv::{parse_csv, parse_upload, CsvUpload};
pub use normalize::{
    edit_records, normalize_entry, normalize_rows, removal_records, Submitter,
};
pub use paginate::{paginate, ListLength};
pub use reconcile::{reconcile, TimeWindow};
pub use removal::remove_revoked;

/// Anything that can hand over a snapshot of a token's whitelist event log.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_whitelist_events(&self, token: &str) -> Result<Vec<RawEvent>>;
}

/// Paginated whitelist plus the number of visible records behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistView {
    pub pages: Vec<Page>,
    pub record_count: usize,
}

/// Rebuild the whitelist view from an already-fetched event log.
pub fn build_view(
    events: &[RawEvent],
    window: Option<&TimeWindow>,
    list_length: ListLength,
) -> Result<WhitelistView> {
    let records = reconcile(events, window);
    let visible = remove_revoked(records)?;
    let record_count = visible.len();
    let pages = paginate(visible, list_length);
    Ok(WhitelistView {
        pages,
        record_count,
    })
}

/// Fetch the event log for `token` and rebuild its view.
pub async fn load_view<S>(
    source: &S,
    token: &str,
    window: Option<&TimeWindow>,
    list_length: ListLength,
) -> Result<WhitelistView>
where
    S: EventSource + ?Sized,
{
    let events = source.fetch_whitelist_events(token).await?;
    let view = build_view(&events, window, list_length)?;
    info!(
        "Built whitelist view for token {}: {} events, {} records, {} pages",
        token,
        events.len(),
        view.record_count,
        view.pages.len()
    );
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WhitelistError;
    use crate::models::WindowBound;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;

    fn event(address: &str, added: i64, start: i64, end: i64) -> RawEvent {
        RawEvent {
            address: address.to_string(),
            added_at: DateTime::<Utc>::from_timestamp(added, 0).unwrap(),
            added_by: None,
            window_start: WindowBound::from_unix_seconds(start).unwrap(),
            window_end: WindowBound::from_unix_seconds(end).unwrap(),
        }
    }

    struct MemorySource {
        logs: HashMap<String, Vec<RawEvent>>,
    }

    #[async_trait]
    impl EventSource for MemorySource {
        async fn fetch_whitelist_events(&self, token: &str) -> Result<Vec<RawEvent>> {
            self.logs
                .get(token)
                .cloned()
                .ok_or_else(|| WhitelistError::EventSource(format!("unknown token {}", token)))
        }
    }

    #[test]
    fn test_update_then_revoke_scenario() {
        let events = vec![
            event("A", 1, 5, 10),
            event("B", 2, 0, 0),
            event("A", 3, 5, 20),
        ];
        let view = build_view(&events, None, ListLength::new(10).unwrap()).unwrap();
        assert_eq!(view.record_count, 1);
        assert_eq!(view.pages.len(), 1);
        assert_eq!(view.pages[0].len(), 1);
        let a = &view.pages[0][0];
        assert_eq!(a.address, "A");
        assert_eq!(a.window_start.as_deref(), Some("Thu Jan 01 1970"));
        assert_eq!(a.added_at.as_deref(), Some("Thu Jan 01 1970"));
    }

    #[test]
    fn test_empty_log_scenario() {
        let view = build_view(&[], None, ListLength::new(5).unwrap()).unwrap();
        assert_eq!(view.record_count, 0);
        assert_eq!(view.pages.len(), 1);
        assert_eq!(view.pages[0].len(), 1);
        assert_eq!(view.pages[0][0].id, paginate::NO_MATCH_ID);
    }

    #[test]
    fn test_view_is_idempotent() {
        let day = 86_400;
        let events = vec![
            event("A", day, day, 10 * day),
            event("B", 2 * day, day, 10 * day),
            event("A", 3 * day, day, 20 * day),
        ];
        let len = ListLength::new(1).unwrap();
        let first = build_view(&events, None, len).unwrap();
        let second = build_view(&events, None, len).unwrap();
        let strip = |view: &WhitelistView| -> Vec<Vec<(String, Option<String>)>> {
            view.pages
                .iter()
                .map(|p| p.iter().map(|r| (r.address.clone(), r.window_end.clone())).collect())
                .collect()
        };
        assert_eq!(strip(&first), strip(&second));
        assert_eq!(first.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_load_view_from_source() {
        let day = 86_400;
        let mut logs = HashMap::new();
        logs.insert(
            "TOKEN".to_string(),
            vec![
                event("A", day, day, 10 * day),
                event("B", 5 * day, day, 10 * day),
            ],
        );
        let source = MemorySource { logs };
        let window = TimeWindow::new(
            DateTime::<Utc>::from_timestamp(2 * day, 0).unwrap(),
            DateTime::<Utc>::from_timestamp(9 * day, 0).unwrap(),
        );

        let view = load_view(&source, "TOKEN", Some(&window), ListLength::default())
            .await
            .unwrap();
        assert_eq!(view.record_count, 1);
        assert_eq!(view.pages[0][0].address, "B");

        let err = load_view(&source, "OTHER", None, ListLength::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WhitelistError::EventSource(_)));
    }
}
