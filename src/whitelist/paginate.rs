// Splits the visible whitelist into fixed-size display pages

use std::num::NonZeroUsize;

use tracing::debug;

use crate::error::{Result, WhitelistError};
use crate::models::{DisplayRecord, Page};

pub const NO_MATCH_ID: &str = "nomatch";
pub const NO_MATCH_ADDRESS: &str = "No investors exist for these dates";
pub const DEFAULT_LIST_LENGTH: usize = 10;

/// Page size. Always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLength(NonZeroUsize);

impl ListLength {
    pub fn new(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(ListLength)
            .ok_or_else(|| {
                WhitelistError::InvalidConfiguration(format!(
                    "list_length must be a positive integer, got {}",
                    value
                ))
            })
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ListLength {
    fn default() -> Self {
        // DEFAULT_LIST_LENGTH is non-zero
        ListLength(NonZeroUsize::new(DEFAULT_LIST_LENGTH).unwrap_or(NonZeroUsize::MIN))
    }
}

impl std::str::FromStr for ListLength {
    type Err = WhitelistError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().parse::<i64>().map_err(|_| {
            WhitelistError::InvalidConfiguration(format!(
                "list_length must be a positive integer, got '{}'",
                s
            ))
        })?;
        ListLength::new(value)
    }
}

/// Placeholder row shown when nothing matched.
pub fn no_match_record() -> DisplayRecord {
    DisplayRecord {
        id: NO_MATCH_ID.to_string(),
        address: NO_MATCH_ADDRESS.to_string(),
        added_at: None,
        added_by: None,
        window_start: None,
        window_end: None,
    }
}

/// Always returns at least one page.
pub fn paginate(records: Vec<DisplayRecord>, list_length: ListLength) -> Vec<Page> {
    let size = list_length.get();
    let total = records.len();
    let mut pages: Vec<Page> = Vec::with_capacity(total.div_ceil(size).max(1));
    let mut current: Page = Vec::with_capacity(size.min(total));

    for (idx, record) in records.into_iter().enumerate() {
        current.push(record);
        if current.len() == size || idx == total - 1 {
            pages.push(std::mem::take(&mut current));
        }
    }

    if pages.is_empty() {
        pages.push(vec![no_match_record()]);
    }

    debug!("Paginated {} records into {} pages of {}", total, pages.len(), size);
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<DisplayRecord> {
        (0..n)
            .map(|i| DisplayRecord {
                id: format!("id-{i}"),
                address: format!("0x{i:040x}"),
                added_at: Some("Wed Jan 01 2020".into()),
                added_by: None,
                window_start: Some("Wed Jan 01 2020".into()),
                window_end: Some("Thu Jan 02 2020".into()),
            })
            .collect()
    }

    fn len(n: i64) -> ListLength {
        ListLength::new(n).unwrap()
    }

    #[test]
    fn test_pages_cover_input_in_order() {
        let input = rows(23);
        let pages = paginate(input.clone(), len(10));
        let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        let flattened: Vec<DisplayRecord> = pages.into_iter().flatten().collect();
        assert_eq!(flattened, input);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_page() {
        let pages = paginate(rows(20), len(10));
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.len() == 10));
    }

    #[test]
    fn test_page_size_one() {
        let pages = paginate(rows(3), len(1));
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_empty_input_yields_sentinel_page() {
        let pages = paginate(Vec::new(), len(5));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 1);
        let sentinel = &pages[0][0];
        assert_eq!(sentinel.id, NO_MATCH_ID);
        assert_eq!(sentinel.address, NO_MATCH_ADDRESS);
        assert!(sentinel.added_at.is_none());
        assert!(sentinel.added_by.is_none());
        assert!(sentinel.window_start.is_none());
        assert!(sentinel.window_end.is_none());
    }

    #[test]
    fn test_list_length_must_be_positive() {
        assert!(matches!(
            ListLength::new(0),
            Err(WhitelistError::InvalidConfiguration(_))
        ));
        assert!(ListLength::new(-3).is_err());
        assert_eq!(ListLength::new(25).unwrap().get(), 25);
        assert_eq!(ListLength::default().get(), DEFAULT_LIST_LENGTH);
    }

    #[test]
    fn test_list_length_from_str() {
        assert_eq!("15".parse::<ListLength>().unwrap().get(), 15);
        assert!("2.5".parse::<ListLength>().is_err());
        assert!("zero".parse::<ListLength>().is_err());
        assert!("0".parse::<ListLength>().is_err());
    }
}
