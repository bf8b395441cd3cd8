//! # Marketplace Accounts Main Entry Point
//!
//! Boots configuration, telemetry, the database pool and migrations, the
//! identity provider, the reconciliation sweep, and finally the HTTP server.

use std::sync::Arc;

use accounts::config::ConfigLoader;
use accounts::identity::{IdentityProvider, gotrue::GoTrueIdentityProvider};
use accounts::migration::{Migrator, MigratorTrait};
use accounts::notify::{Notifier, default::LogNotifier};
use accounts::reconciliation::ReconciliationService;
use accounts::server::run_server;
use accounts::{db, identity, telemetry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config = Arc::new(ConfigLoader::new().load()?);
    telemetry::init_tracing(&config);

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::info!(configuration = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    // An identity base URL selects the HTTP provider; without one the
    // in-memory provider keeps the local profile self-contained.
    let identity_provider: Arc<dyn IdentityProvider> = match config.identity_base_url {
        Some(_) => Arc::new(GoTrueIdentityProvider::from_config(&config)?),
        None => {
            tracing::warn!("No identity base URL configured; using in-memory identity provider");
            Arc::new(identity::memory::InMemoryIdentityProvider::new())
        }
    };

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let shutdown = CancellationToken::new();
    let reconciliation = ReconciliationService::new(
        Arc::clone(&config),
        db.clone(),
        Arc::clone(&notifier),
    );
    let reconciliation_shutdown = shutdown.clone();
    let reconciliation_handle = tokio::spawn(async move {
        reconciliation.run(reconciliation_shutdown).await;
    });

    let serve_result = run_server(Arc::clone(&config), db, identity_provider, notifier).await;

    shutdown.cancel();
    let _ = reconciliation_handle.await;

    serve_result
}
