// Bulk CSV upload parsing
//
// Data lines look like `<ignored>,<address>,<sell>,<buy>`. Only lines that
// contain "0x" are data; headers, comments and blank lines are skipped.

use tracing::debug;

use crate::error::{Result, RowError, WhitelistError};
use crate::models::CsvRow;

const ADDRESS_MARKER: &str = "0x";
const FIELDS_PER_ROW: usize = 4;

/// Parsed upload. `addresses`, `sell` and `buy` always have equal length and
/// share row order; rows that could not be split are listed in `rejected`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvUpload {
    pub addresses: Vec<String>,
    pub sell: Vec<String>,
    pub buy: Vec<String>,
    pub lines: Vec<usize>,
    pub rejected: Vec<RowError>,
}

impl CsvUpload {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn rows(&self) -> Vec<CsvRow> {
        self.lines
            .iter()
            .zip(&self.addresses)
            .zip(self.sell.iter().zip(&self.buy))
            .map(|((line, address), (sell, buy))| CsvRow {
                line: *line,
                address: address.clone(),
                window_start_raw: sell.clone(),
                window_end_raw: buy.clone(),
            })
            .collect()
    }
}

/// Declared content type must look like CSV; the body is never sniffed.
pub fn is_csv_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("csv")
}

/// Parse an uploaded file, failing fast when it is not declared as CSV.
pub fn parse_upload(content_type: &str, text: &str) -> Result<CsvUpload> {
    if !is_csv_content_type(content_type) {
        return Err(WhitelistError::NotCsv {
            content_type: content_type.to_string(),
        });
    }
    Ok(parse_csv(text))
}

pub fn parse_csv(text: &str) -> CsvUpload {
    let mut upload = CsvUpload::default();

    for (idx, entry) in text.lines().enumerate() {
        let line = idx + 1;
        if !entry.contains(ADDRESS_MARKER) {
            continue;
        }

        // Anything past the fourth field is dropped.
        let fields: Vec<&str> = entry.split(',').take(FIELDS_PER_ROW).collect();
        if fields.len() < FIELDS_PER_ROW {
            let err = WhitelistError::MalformedRow {
                line,
                fields: fields.len(),
            };
            debug!("Skipping CSV row: {}", err);
            upload.rejected.push(RowError::new(line, &err));
            continue;
        }

        upload.addresses.push(fields[1].to_string());
        upload.sell.push(fields[2].to_string());
        upload.buy.push(fields[3].to_string());
        upload.lines.push(line);
    }

    debug!(
        "Parsed CSV: {} rows, {} rejected",
        upload.len(),
        upload.rejected.len()
    );
    upload
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_A: &str = "0xdc4d23daf21da6163369940af54e5a1be783497b";
    const ADDR_B: &str = "0x8f2c1e9b3a4d5e6f708192a3b4c5d6e7f8091a2b";

    #[test]
    fn test_parse_well_formed_rows() {
        let text = format!(
            "id,address,sell,buy\n,{ADDR_A},2020-01-01,2020-06-01\r\n,{ADDR_B},2021-01-01,2021-06-01\n"
        );
        let upload = parse_csv(&text);
        assert_eq!(upload.len(), 2);
        assert_eq!(upload.sell.len(), 2);
        assert_eq!(upload.buy.len(), 2);
        assert_eq!(upload.addresses, vec![ADDR_A, ADDR_B]);
        assert_eq!(upload.sell, vec!["2020-01-01", "2021-01-01"]);
        assert_eq!(upload.buy, vec!["2020-06-01", "2021-06-01"]);
        assert_eq!(upload.lines, vec![2, 3]);
        assert!(upload.is_clean());
    }

    #[test]
    fn test_non_address_lines_are_skipped() {
        let text = format!("\n# investors\nheader,a,b,c\n,{ADDR_A},x,y\n\n");
        let upload = parse_csv(&text);
        assert_eq!(upload.addresses, vec![ADDR_A]);
        assert!(upload.is_clean());
    }

    #[test]
    fn test_short_row_is_rejected_not_padded() {
        let text = format!(",{ADDR_A},2020-01-01\n,{ADDR_B},2021-01-01,2021-06-01\n");
        let upload = parse_csv(&text);
        assert_eq!(upload.addresses, vec![ADDR_B]);
        assert_eq!(upload.sell.len(), upload.buy.len());
        assert_eq!(upload.rejected.len(), 1);
        assert_eq!(upload.rejected[0].line, 1);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let text = format!(",{ADDR_A},2020-01-01,2020-06-01,note,more\n");
        let upload = parse_csv(&text);
        assert_eq!(upload.buy, vec!["2020-06-01"]);
    }

    #[test]
    fn test_invalid_address_is_forwarded() {
        let upload = parse_csv(",0xnothex,2020-01-01,2020-06-01\n");
        assert_eq!(upload.addresses, vec!["0xnothex"]);
    }

    #[test]
    fn test_rows_keep_line_numbers() {
        let text = format!("header\n,{ADDR_A},s,b\n");
        let rows = parse_csv(&text).rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].window_start_raw, "s");
        assert_eq!(rows[0].window_end_raw, "b");
    }

    #[test]
    fn test_non_csv_content_type_fails_fast() {
        let err = parse_upload("application/json", ",0xabc,1,2").unwrap_err();
        assert!(matches!(err, WhitelistError::NotCsv { .. }));

        assert!(parse_upload("text/csv; charset=utf-8", "").is_ok());
        assert!(parse_upload("application/vnd.ms-excel.csv", "").is_ok());
    }
}
