// Whitelist Backend Server
// Event indexer + reconciled whitelist API

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use whitelist_backend::{
    config::AppConfig,
    database::{Database, EventStore},
    indexer::Indexer,
    router,
    sink::RpcSubmissionSink,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("whitelist_backend=info".parse()?)
                .add_directive("sqlx=warn".parse()?),
        )
        .init();

    info!("Starting Whitelist Backend Server");

    let config = AppConfig::from_env()?;
    config.log_summary();

    // Initialize database
    let db = Database::init(&config.database_url).await?;

    // Start event indexer in background
    let indexer_status = if config.indexer_enabled {
        let indexer = Indexer::new(
            config.ledger_rpc_url.clone(),
            config.package_id.clone(),
            db.clone(),
        );
        let status = indexer.status();
        tokio::spawn(async move {
            info!("Starting event indexer...");
            indexer.run().await;
        });
        Some(status)
    } else {
        None
    };

    let state = Arc::new(AppState {
        db: Some(db.clone()),
        events: Arc::new(EventStore::new(db)),
        sink: Arc::new(RpcSubmissionSink::new(
            config.ledger_rpc_url.clone(),
            config.package_id.clone(),
        )),
        operator_address: config.operator_address.clone(),
        list_length: config.list_length,
        indexer: indexer_status,
    });

    let app = router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Whitelist Backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
