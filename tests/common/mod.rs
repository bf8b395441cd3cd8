//! Shared helpers for integration tests.

use std::sync::Arc;

use accounts::config::AppConfig;
use accounts::identity::memory::InMemoryIdentityProvider;
use accounts::migration::{Migrator, MigratorTrait};
use accounts::notify::default::RecordingNotifier;
use accounts::repositories::BusinessInfo;
use accounts::server::AppState;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

pub const ADMIN_TOKEN: &str = "integration-admin-token";

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Rewrite the users table into its legacy shape (no identity_id column).
pub async fn strip_identity_column(db: &DatabaseConnection) {
    for sql in [
        "DROP INDEX idx_users_identity_id",
        "ALTER TABLE users DROP COLUMN identity_id",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await
        .unwrap();
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn harness() -> TestHarness {
    let db = setup_db().await;
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let state = AppState {
        config: Arc::new(AppConfig {
            admin_tokens: vec![ADMIN_TOKEN.to_string()],
            ..Default::default()
        }),
        db,
        identity: identity.clone(),
        notifier: notifier.clone(),
    };

    TestHarness {
        state,
        identity,
        notifier,
    }
}

pub fn business(email: &str) -> BusinessInfo {
    BusinessInfo {
        business_name: "Tidal Goods".to_string(),
        business_description: "Coastal provisions".to_string(),
        contact_email: email.to_string(),
        contact_phone: "+15550123".to_string(),
        address: "1 Harbor Way".to_string(),
        website: None,
        verification_data: None,
    }
}
