//! # Vendor Profile Repository
//!
//! Creates the queryable vendor profile from an approved application. The
//! unique index on `identity_id` is the idempotency mechanism: a replayed
//! approval hits the unique violation and reports `AlreadyExists`, which
//! callers treat as success.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::{DomainError, is_unique_violation, store_error};
use crate::models::vendor_application;
use crate::models::vendor_profile::{self, ProfileStatus};

/// Result of a profile creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOutcome {
    Created,
    AlreadyExists,
}

/// Repository for vendor profile persistence.
pub struct VendorProfileRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VendorProfileRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Materialize the profile for an approved application, denormalizing
    /// its business fields. Safe to replay.
    pub async fn create_from_application(
        &self,
        application: &vendor_application::Model,
    ) -> Result<ProfileOutcome, DomainError> {
        let row = vendor_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            identity_id: Set(application.identity_id),
            business_name: Set(application.business_name.clone()),
            business_description: Set(application.business_description.clone()),
            contact_email: Set(application.contact_email.clone()),
            contact_phone: Set(application.contact_phone.clone()),
            address: Set(application.address.clone()),
            website: Set(application.website.clone()),
            status: Set(ProfileStatus::Active),
            created_at: Set(Utc::now().into()),
        };

        match row.insert(self.db).await {
            Ok(_) => Ok(ProfileOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(ProfileOutcome::AlreadyExists),
            Err(err) => Err(store_error(err)),
        }
    }

    pub async fn find_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<vendor_profile::Model>, DomainError> {
        vendor_profile::Entity::find()
            .filter(vendor_profile::Column::IdentityId.eq(identity_id))
            .one(self.db)
            .await
            .map_err(store_error)
    }
}
