//! # Vendor Analytics Repository
//!
//! Seeds the zero-initialized analytics row for a newly approved vendor.
//! Keyed by identity ID; seeding is replay-safe.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::error::{DomainError, is_unique_violation, store_error};
use crate::models::vendor_analytics;

/// Result of an analytics seed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded,
    AlreadySeeded,
}

/// Repository for vendor analytics persistence.
pub struct VendorAnalyticsRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VendorAnalyticsRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert the zeroed metrics row for an identity. A primary-key conflict
    /// means a previous approval already seeded it.
    pub async fn seed(&self, identity_id: Uuid) -> Result<SeedOutcome, DomainError> {
        let now = Utc::now();

        let row = vendor_analytics::ActiveModel {
            identity_id: Set(identity_id),
            listings_count: Set(0),
            total_views: Set(0),
            total_contacts: Set(0),
            conversion_rate: Set(0.0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match row.insert(self.db).await {
            Ok(_) => Ok(SeedOutcome::Seeded),
            Err(err) if is_unique_violation(&err) => Ok(SeedOutcome::AlreadySeeded),
            Err(err) => Err(store_error(err)),
        }
    }

    pub async fn find_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<vendor_analytics::Model>, DomainError> {
        vendor_analytics::Entity::find_by_id(identity_id)
            .one(self.db)
            .await
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn seed_zero_initializes() {
        let db = setup_db().await;
        let repo = VendorAnalyticsRepository::new(&db);
        let identity_id = Uuid::new_v4();

        assert_eq!(repo.seed(identity_id).await.unwrap(), SeedOutcome::Seeded);

        let row = repo.find_by_identity(identity_id).await.unwrap().unwrap();
        assert_eq!(row.listings_count, 0);
        assert_eq!(row.total_views, 0);
        assert_eq!(row.total_contacts, 0);
        assert_eq!(row.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn reseeding_is_replay_safe() {
        let db = setup_db().await;
        let repo = VendorAnalyticsRepository::new(&db);
        let identity_id = Uuid::new_v4();

        repo.seed(identity_id).await.unwrap();
        assert_eq!(
            repo.seed(identity_id).await.unwrap(),
            SeedOutcome::AlreadySeeded
        );
    }
}
