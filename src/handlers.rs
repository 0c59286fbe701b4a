// HTTP handlers for the whitelist API

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, WhitelistError};
use crate::models::{
    CsvUploadResponse, EditRequest, Receipt, Record, RemoveRequest, SubmissionResponse,
    SubmitRequest, ViewRequest, ViewResponse,
};
use crate::whitelist::{
    self, edit_records, normalize_entry, normalize_rows, parse_upload, removal_records,
    ListLength, Submitter, TimeWindow,
};
use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let db_health = match &state.db {
        Some(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
        None => false,
    };
    let (indexer, last_poll) = match &state.indexer {
        Some(status) => (status.state(Utc::now()), status.last_poll()),
        None => ("disabled", None),
    };

    Json(serde_json::json!({
        "status": if db_health { "healthy" } else { "unhealthy" },
        "database": if db_health { "up" } else { "down" },
        "indexer": indexer,
        "indexer_last_poll": last_poll.map(|ts| ts.to_rfc3339())
    }))
}

/// Paginated whitelist for a token, rebuilt from its event log
pub async fn view_whitelist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ViewRequest>,
) -> Result<Json<ViewResponse>> {
    let window = TimeWindow::from_bounds(req.calendar_start, req.calendar_end)?;
    let list_length = match req.list_length {
        Some(n) => ListLength::new(n)?,
        None => state.list_length,
    };

    let view =
        whitelist::load_view(state.events.as_ref(), &req.token, window.as_ref(), list_length).await?;

    Ok(Json(ViewResponse {
        page_count: view.pages.len(),
        record_count: view.record_count,
        pages: view.pages,
    }))
}

/// Parse an uploaded CSV for preview; nothing is submitted
pub async fn upload_csv(headers: HeaderMap, body: String) -> Result<Json<CsvUploadResponse>> {
    let upload = parse_upload(content_type(&headers), &body)?;

    let message = if upload.is_clean() {
        "CSV upload was successful!".to_string()
    } else {
        warn!("CSV upload had {} malformed rows", upload.rejected.len());
        format!(
            "CSV upload parsed {} rows, {} rejected",
            upload.len(),
            upload.rejected.len()
        )
    };
    info!("CSV upload: {} rows", upload.len());

    Ok(Json(CsvUploadResponse {
        message,
        addresses: upload.addresses,
        sell: upload.sell,
        buy: upload.buy,
        rejected: upload.rejected,
    }))
}

/// Parse, normalize and submit a CSV upload in one batch
pub async fn submit_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<SubmissionResponse>> {
    let upload = parse_upload(content_type(&headers), &body)?;
    if !upload.is_clean() {
        return Err(WhitelistError::Rejected {
            rows: upload.rejected,
        });
    }
    if upload.is_empty() {
        return Err(WhitelistError::EmptyBatch);
    }

    let records = normalize_rows(&upload.rows(), &state.submitter())?;
    submit(&state, records, "CSV was successfully uploaded").await
}

/// Submit manually entered investors
pub async fn submit_entries(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmissionResponse>> {
    let submitter = state.submitter();
    let mut records = Vec::with_capacity(req.entries.len());
    let mut rejected = Vec::new();
    for (idx, entry) in req.entries.iter().enumerate() {
        match normalize_entry(&entry.address, &entry.window_start, &entry.window_end, &submitter) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push(crate::error::RowError::new(idx + 1, &e)),
        }
    }
    if !rejected.is_empty() {
        return Err(WhitelistError::Rejected { rows: rejected });
    }

    submit(&state, records, "Investors added successfully").await
}

/// Give many investors the same access window
pub async fn edit_investors(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EditRequest>,
) -> Result<Json<SubmissionResponse>> {
    let records = edit_records(
        &req.addresses,
        &req.window_start,
        &req.window_end,
        &state.submitter(),
    )?;
    submit(&state, records, "Investors updated successfully").await
}

/// Revoke access by collapsing both window bounds to the epoch origin
pub async fn remove_investors(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<SubmissionResponse>> {
    let records = removal_records(&req.addresses, &state.submitter())?;
    submit(&state, records, "Investors removed successfully").await
}

async fn submit(
    state: &AppState,
    records: Vec<Record>,
    message: &str,
) -> Result<Json<SubmissionResponse>> {
    let receipt: Receipt = match records.as_slice() {
        [] => return Err(WhitelistError::EmptyBatch),
        [record] => state.sink.submit_one(record).await?,
        many => state.sink.submit_many(many).await?,
    };

    info!(
        "Submitted {} whitelist records in transaction {}",
        records.len(),
        receipt.transaction_hash
    );

    Ok(Json(SubmissionResponse {
        message: message.to_string(),
        transaction_hash: receipt.transaction_hash,
        submitted: records.len(),
    }))
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

impl AppState {
    fn submitter(&self) -> Submitter {
        Submitter::new(self.operator_address.clone(), Utc::now())
    }
}
