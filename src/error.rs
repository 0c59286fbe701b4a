// Error types for the whitelist backend

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WhitelistError>;

/// A rejected input row, identified by its 1-based position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

impl RowError {
    pub fn new(line: usize, err: &WhitelistError) -> Self {
        Self {
            line,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("file is not a CSV upload (content type '{content_type}')")]
    NotCsv { content_type: String },
    #[error("line {line}: expected 4 comma-separated fields, found {fields}")]
    MalformedRow { line: usize, fields: usize },
    #[error("'{value}' is not a calendar date")]
    UnparseableDate { value: String },
    #[error("'{address}' is not a valid address")]
    InvalidAddress { address: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("no investors to submit")]
    EmptyBatch,
    #[error("{} row(s) rejected", rows.len())]
    Rejected { rows: Vec<RowError> },
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("event source error: {0}")]
    EventSource(String),
}

impl WhitelistError {
    fn status(&self) -> StatusCode {
        match self {
            WhitelistError::NotCsv { .. }
            | WhitelistError::MalformedRow { .. }
            | WhitelistError::UnparseableDate { .. }
            | WhitelistError::InvalidAddress { .. }
            | WhitelistError::EmptyBatch
            | WhitelistError::Rejected { .. } => StatusCode::BAD_REQUEST,
            WhitelistError::InvalidConfiguration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WhitelistError::Submission(_) | WhitelistError::EventSource(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for WhitelistError {
    fn into_response(self) -> Response {
        let status = self.status();
        let rows = match &self {
            WhitelistError::Rejected { rows } => rows.clone(),
            _ => Vec::new(),
        };
        let body = Json(json!({
            "error": self.to_string(),
            "rows": rows,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_csv = WhitelistError::NotCsv {
            content_type: "image/png".to_string(),
        };
        assert_eq!(not_csv.status(), StatusCode::BAD_REQUEST);
        assert_eq!(WhitelistError::EmptyBatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WhitelistError::InvalidConfiguration("list_length".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            WhitelistError::Submission("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_rejected_message_counts_rows() {
        let err = WhitelistError::Rejected {
            rows: vec![
                RowError::new(2, &WhitelistError::MalformedRow { line: 2, fields: 3 }),
                RowError::new(5, &WhitelistError::UnparseableDate { value: "soon".into() }),
            ],
        };
        assert_eq!(err.to_string(), "2 row(s) rejected");
    }

    #[test]
    fn test_submission_error_is_verbatim() {
        let err = WhitelistError::Submission("execution reverted: not owner".into());
        assert_eq!(err.to_string(), "submission failed: execution reverted: not owner");
    }
}
