//! Loyalty ledger API server.
//!
//! Main entry point for the loyalty ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loyalty_api::{AppState, create_router};
use loyalty_core::LoyaltyService;
use loyalty_core::authz::ScopeResolver;
use loyalty_core::ledger::{LedgerStore, TransactionProcessor};
use loyalty_core::tier::TierTable;
use loyalty_db::{LedgerRepository, connect};
use loyalty_shared::types::TenantId;
use loyalty_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loyalty=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let tiers = TierTable::from_config(&config.tiers).context("Invalid tier table")?;
    info!(tiers = tiers.thresholds().len(), "Tier table loaded");

    let store: Arc<dyn LedgerStore> = Arc::new(LedgerRepository::new(db));
    let processor = TransactionProcessor::new(store, tiers)
        .with_max_commit_attempts(config.ledger.max_commit_attempts);

    let host_tenant = TenantId::from_uuid(config.authorization.host_tenant_id);
    info!(%host_tenant, "Authorization configured");
    let service = LoyaltyService::new(ScopeResolver::new(host_tenant), processor);

    let state = AppState {
        service: Arc::new(service),
        jwt_service: Arc::new(JwtService::new(&config.jwt)),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
