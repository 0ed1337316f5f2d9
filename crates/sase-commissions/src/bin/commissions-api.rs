//! Commissions engine HTTP server

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use sase_commissions::config::AppConfig;
use sase_commissions::http::{router, AppState};
use sase_commissions::infrastructure::{InMemoryCommissionStore, NoOpEventPublisher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sase_commissions::telemetry::init();

    let path = std::env::var("COMMISSIONS_CONFIG").unwrap_or_else(|_| "commissions".to_string());
    let config = AppConfig::load(Some(&path)).context("loading configuration")?;

    let store = Arc::new(InMemoryCommissionStore::new());
    store.load_reference(&config.reference);
    info!(
        products = config.reference.products.len(),
        stages = config.reference.stages.len(),
        rules = config.reference.rules.len(),
        "reference data loaded"
    );
    let ports = store.ports(Arc::new(NoOpEventPublisher));
    let state = AppState::from_ports(ports, &config.engine)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    info!(
        addr = %config.server.bind_addr,
        trailing_rate_factor = %config.engine.trailing_rate_factor,
        "commissions api listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
