//! Vendor application entity model
//!
//! A user's request to sell under one or more marketplace categories.
//! Applications are keyed by identity ID (stable across linkage shapes) and
//! are never hard-deleted: reviewed rows remain as audit trail.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Review status of a vendor application.
///
/// Transitions only `pending -> approved` and `pending -> rejected`; a
/// terminal status never changes again. Re-review requires a new
/// application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ApplicationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Marketplace category a vendor can sell under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Property,
    Food,
    Store,
    Project,
}

impl Category {
    /// Parse a category slug as submitted by applicants.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "property" => Some(Category::Property),
            "food" => Some(Category::Food),
            "store" => Some(Category::Store),
            "project" => Some(Category::Project),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Property => "property",
            Category::Food => "food",
            Category::Store => "store",
            Category::Project => "project",
        }
    }
}

/// Vendor application entity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor_applications")]
pub struct Model {
    /// Generated application identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning identity (not the internal user ID)
    pub identity_id: Uuid,

    /// Requested category set, stored as a JSON array of category slugs
    pub categories: Json,

    pub business_name: String,
    pub business_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub website: Option<String>,

    /// Free-form verification data supplied by the applicant
    pub verification_data: Option<Json>,

    pub status: ApplicationStatus,

    /// Admin who reviewed the application
    pub reviewer_id: Option<Uuid>,
    pub reviewed_at: Option<DateTimeWithTimeZone>,
    pub admin_notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Decode the stored category set. Rows written through the submission
    /// handler always hold valid slugs; unknown values are skipped rather
    /// than failing audit reads.
    pub fn category_set(&self) -> Vec<Category> {
        serde_json::from_value::<Vec<Category>>(self.categories.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
