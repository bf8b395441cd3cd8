//! User entity model
//!
//! The application-level profile row linked to an external identity. Two
//! historical shapes of the `users` table exist across deployments:
//!
//! * current: independently generated `id` plus an `identity_id`
//!   back-reference column (the entity at the top of this module);
//! * legacy: `id` literally equals the identity ID and the back-reference
//!   column is absent (the [`legacy`] submodule).
//!
//! The user repository decides which shape is live at runtime.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Authoritative application-level role. The role stashed in identity
/// metadata at signup is informational only and never read back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum UserRole {
    #[sea_orm(string_value = "guest")]
    #[default]
    Guest,
    #[sea_orm(string_value = "registered")]
    Registered,
    #[sea_orm(string_value = "vendor")]
    Vendor,
    #[sea_orm(string_value = "agent")]
    Agent,
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// User entity, current linkage shape.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Internal identifier (primary key, independent of the identity ID)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Back-reference to the external identity (unique per user)
    #[sea_orm(unique)]
    pub identity_id: Option<Uuid>,

    /// Email duplicated from the identity for query convenience;
    /// eventually consistent, not transactional
    pub email: String,

    /// Display name
    pub display_name: String,

    /// Phone number (optional)
    pub phone: Option<String>,

    /// Authoritative role
    pub role: UserRole,

    /// Active flag; cleared on soft-delete
    pub is_active: bool,

    /// Timestamp when the record was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp of the last mutation
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Legacy linkage shape of the same table: no back-reference column, the
/// primary key is the identity ID itself.
pub mod legacy {
    use sea_orm::ActiveModelBehavior;
    use sea_orm::entity::prelude::*;
    use sea_orm::prelude::DateTimeWithTimeZone;
    use serde::{Deserialize, Serialize};

    use super::UserRole;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        /// Identity ID doubling as the primary key
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub email: String,
        pub display_name: String,
        pub phone: Option<String>,
        pub role: UserRole,
        pub is_active: bool,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Shape-independent view of a user record returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    /// Internal ID; equals the identity ID under the legacy shape
    pub id: Uuid,
    /// Back-reference to the identity; `None` under the legacy shape
    pub identity_id: Option<Uuid>,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl UserRecord {
    /// The identity this record resolves to, regardless of linkage shape.
    pub fn resolved_identity_id(&self) -> Uuid {
        self.identity_id.unwrap_or(self.id)
    }
}

impl From<Model> for UserRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            identity_id: model.identity_id,
            email: model.email,
            display_name: model.display_name,
            phone: model.phone,
            role: model.role,
            is_active: model.is_active,
        }
    }
}

impl From<legacy::Model> for UserRecord {
    fn from(model: legacy::Model) -> Self {
        Self {
            id: model.id,
            identity_id: None,
            email: model.email,
            display_name: model.display_name,
            phone: model.phone,
            role: model.role,
            is_active: model.is_active,
        }
    }
}
