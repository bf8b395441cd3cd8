//! Vendor profile entity model
//!
//! The promoted, queryable vendor identity, derived 1:1 from an approved
//! vendor application. The unique index on identity_id keeps repeated
//! approvals from creating a second profile.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a vendor profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ProfileStatus {
    #[sea_orm(string_value = "active")]
    #[default]
    Active,
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

/// Vendor profile entity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning identity; at most one active profile per identity
    #[sea_orm(unique)]
    pub identity_id: Uuid,

    pub business_name: String,
    pub business_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub website: Option<String>,

    pub status: ProfileStatus,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
