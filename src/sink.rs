// Submission of whitelist records to the registry over JSON-RPC

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::{Result, WhitelistError};
use crate::indexer::RpcResponse;
use crate::models::{Receipt, Record};

const MODIFY_METHOD: &str = "whitelist_modify";
const MODIFY_MULTI_METHOD: &str = "whitelist_modifyMulti";

/// Where normalized records go once the user confirms them.
///
/// Failures are reported as they are; retrying is the caller's decision.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit_one(&self, record: &Record) -> Result<Receipt>;
    async fn submit_many(&self, records: &[Record]) -> Result<Receipt>;
}

pub struct RpcSubmissionSink {
    http_client: HttpClient,
    rpc_url: String,
    package_id: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    digest: String,
}

impl RpcSubmissionSink {
    pub fn new(rpc_url: String, package_id: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            rpc_url,
            package_id,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Receipt> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": [self.package_id, params],
            "id": 1
        });

        let resp = self
            .http_client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| submission_failed(method, e.to_string()))?;

        let rpc_resp: RpcResponse<SubmitResult> = resp
            .json()
            .await
            .map_err(|e| submission_failed(method, e.to_string()))?;

        if let Some(err) = rpc_resp.error {
            return Err(submission_failed(
                method,
                format!("{} ({})", err.message, err.code),
            ));
        }

        let result = rpc_resp
            .result
            .ok_or_else(|| submission_failed(method, "no result in RPC response".to_string()))?;

        info!("{} accepted in transaction {}", method, result.digest);
        Ok(Receipt {
            transaction_hash: result.digest,
        })
    }
}

#[async_trait]
impl SubmissionSink for RpcSubmissionSink {
    async fn submit_one(&self, record: &Record) -> Result<Receipt> {
        let params = record_payload(record)?;
        self.call(MODIFY_METHOD, params).await
    }

    async fn submit_many(&self, records: &[Record]) -> Result<Receipt> {
        let params = records
            .iter()
            .map(record_payload)
            .collect::<Result<Vec<_>>>()?;
        self.call(MODIFY_MULTI_METHOD, Value::Array(params)).await
    }
}

fn submission_failed(method: &str, message: String) -> WhitelistError {
    error!("{} failed: {}", method, message);
    WhitelistError::Submission(message)
}

/// Wire shape expected by the registry: window bounds in unix seconds.
pub fn record_payload(record: &Record) -> Result<Value> {
    Ok(json!({
        "investor": record.address,
        "added_by": record.added_by,
        "added_at": record.added_at.timestamp_millis(),
        "from_time": record.window_start.unix_seconds()?,
        "to_time": record.window_end.unix_seconds()?,
    }))
}
