// Environment-driven configuration

use anyhow::{Context, Result};
use tracing::info;

use crate::whitelist::ListLength;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub ledger_rpc_url: String,
    pub package_id: String,
    /// Identity stamped as `added_by` on outgoing submissions
    pub operator_address: String,
    pub list_length: ListLength,
    pub port: u16,
    pub indexer_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "postgres://localhost/whitelist".to_string());
        let ledger_rpc_url =
            lookup("LEDGER_RPC_URL").context("LEDGER_RPC_URL must be set in environment")?;
        let package_id =
            lookup("REGISTRY_PACKAGE_ID").context("REGISTRY_PACKAGE_ID must be set")?;
        let operator_address =
            lookup("OPERATOR_ADDRESS").context("OPERATOR_ADDRESS must be set")?;
        let list_length = match lookup("LIST_LENGTH") {
            Some(raw) => raw.parse::<ListLength>()?,
            None => ListLength::default(),
        };
        let port = lookup("PORT")
            .unwrap_or_else(|| "4000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        let indexer_enabled = lookup("INDEXER_ENABLED")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            ledger_rpc_url,
            package_id,
            operator_address,
            list_length,
            port,
            indexer_enabled,
        })
    }

    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  Database: {}", self.database_url);
        info!("  Ledger RPC: {}", self.ledger_rpc_url);
        info!("  Registry Package ID: {}", self.package_id);
        info!("  Operator: {}", self.operator_address);
        info!("  Page size: {}", self.list_length.get());
        info!("  Server Port: {}", self.port);
        info!("  Indexer: {}", if self.indexer_enabled { "enabled" } else { "disabled" });
    }
}
