//! # User Repository
//!
//! The user record synchronizer: creates and links the application-level
//! user row to an external identity, tolerating the two historical linkage
//! shapes of the `users` table.
//!
//! The current shape carries an `identity_id` back-reference column; legacy
//! deployments lack it and use the identity ID as the primary key. The
//! repository attempts the current shape first and falls back exactly once
//! when the insert fails with an undefined-column signature. The legacy
//! column set is a subset of the current shape, so updates and deletes that
//! touch only shared columns go through the legacy entity and are valid
//! under either schema.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::{DomainError, is_undefined_column, is_unique_violation, store_error};
use crate::models::user::{self, UserRecord, UserRole, legacy};

/// Request data for linking a user record to an identity.
#[derive(Debug, Clone)]
pub struct LinkUserRequest {
    pub identity_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Which linkage shape served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    Current,
    Legacy,
}

/// Repository for user record operations.
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the user record for a freshly provisioned identity.
    ///
    /// Attempts the current shape, falls back once to the legacy shape on an
    /// undefined-column error. Any other failure is fatal and not retried.
    pub async fn link_user(
        &self,
        request: LinkUserRequest,
    ) -> Result<(UserRecord, LinkStrategy), DomainError> {
        let now = Utc::now();

        let current = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            identity_id: Set(Some(request.identity_id)),
            email: Set(request.email.clone()),
            display_name: Set(request.display_name.clone()),
            phone: Set(request.phone.clone()),
            role: Set(request.role),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match current.insert(self.db).await {
            Ok(model) => Ok((model.into(), LinkStrategy::Current)),
            Err(err) if is_unique_violation(&err) => Err(DomainError::AlreadyLinked),
            Err(err) if is_undefined_column(&err) => {
                tracing::warn!(
                    identity_id = %request.identity_id,
                    "users table lacks identity_id column; retrying with legacy linkage"
                );
                self.link_user_legacy(request).await
            }
            Err(err) => Err(store_error(err)),
        }
    }

    async fn link_user_legacy(
        &self,
        request: LinkUserRequest,
    ) -> Result<(UserRecord, LinkStrategy), DomainError> {
        let now = Utc::now();

        let legacy_row = legacy::ActiveModel {
            id: Set(request.identity_id),
            email: Set(request.email),
            display_name: Set(request.display_name),
            phone: Set(request.phone),
            role: Set(request.role),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match legacy_row.insert(self.db).await {
            Ok(model) => Ok((model.into(), LinkStrategy::Legacy)),
            Err(err) if is_unique_violation(&err) => Err(DomainError::AlreadyLinked),
            Err(err) if is_undefined_column(&err) => Err(DomainError::SchemaIncompatible(
                format!("legacy linkage insert also failed: {}", err),
            )),
            Err(err) => Err(store_error(err)),
        }
    }

    /// Resolve the user record owning an identity, under either shape:
    /// through the back-reference column when present, or through the
    /// primary key under the legacy shape.
    pub async fn find_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<UserRecord>, DomainError> {
        let current = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::IdentityId.eq(identity_id))
                    .add(user::Column::Id.eq(identity_id)),
            )
            .one(self.db)
            .await;

        match current {
            Ok(found) => Ok(found.map(UserRecord::from)),
            Err(err) if is_undefined_column(&err) => legacy::Entity::find_by_id(identity_id)
                .one(self.db)
                .await
                .map(|found| found.map(UserRecord::from))
                .map_err(store_error),
            Err(err) => Err(store_error(err)),
        }
    }

    /// Set the role on the user record owning an identity. Returns `false`
    /// when no record resolves to the identity.
    pub async fn set_role_by_identity(
        &self,
        identity_id: Uuid,
        role: UserRole,
    ) -> Result<bool, DomainError> {
        let Some(record) = self.find_by_identity(identity_id).await? else {
            return Ok(false);
        };

        let update = legacy::ActiveModel {
            role: Set(role),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let result = legacy::Entity::update_many()
            .set(update)
            .filter(legacy::Column::Id.eq(record.id))
            .exec(self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Hard-delete a user record by internal ID. Idempotent; used as a
    /// compensating action while the saga still owns the row exclusively.
    pub async fn delete_by_id(&self, user_id: Uuid) -> Result<bool, DomainError> {
        let result = legacy::Entity::delete_by_id(user_id)
            .exec(self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected > 0)
    }
}
