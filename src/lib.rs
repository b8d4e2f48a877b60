pub mod api;
pub mod config;
pub mod extraction;
pub mod pipeline;
pub mod report;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use report::LifecycleManager;

/// Initialize tracing and run the QA service until shutdown.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let cfg = Arc::new(config::AppConfig::default());
    std::fs::create_dir_all(&cfg.reports_dir)?;

    let manager = Arc::new(LifecycleManager::new(cfg));
    let mut server = api::start_server(manager, config::DEFAULT_BIND_ADDR).await?;
    tracing::info!(addr = %server.addr, "serving report QA API");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    Ok(())
}
