//! # Vendor Application Repository
//!
//! Submission and review bookkeeping for vendor applications. Validation is
//! ordered and fail-fast: the category set first, then required business
//! fields, then the contact email. Only the first violation is reported.
//!
//! Reviewed rows are never deleted; they remain as the audit trail of the
//! approval pipeline.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::{DomainError, store_error};
use crate::models::vendor_application::{self, ApplicationStatus, Category};

/// Deliberately loose: one `@`, no whitespace, a dot in the domain part.
/// Deliverability is the mail provider's problem, not ours.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"));

/// Business details accompanying a vendor application.
#[derive(Debug, Clone)]
pub struct BusinessInfo {
    pub business_name: String,
    pub business_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub website: Option<String>,
    pub verification_data: Option<serde_json::Value>,
}

/// Validate a raw category slug list into the typed set.
///
/// Exposed separately so the provisioning saga can reject a bad category set
/// before any side effect is taken.
pub fn validate_categories(slugs: &[String]) -> Result<Vec<Category>, DomainError> {
    if slugs.is_empty() {
        return Err(DomainError::validation(
            "INVALID_CATEGORIES",
            "at least one category is required",
        ));
    }

    let mut categories = Vec::with_capacity(slugs.len());
    for slug in slugs {
        match Category::from_slug(slug) {
            Some(category) => {
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
            None => {
                return Err(DomainError::validation_with_details(
                    "INVALID_CATEGORIES",
                    format!("unknown category '{}'", slug),
                    serde_json::json!({ "category": slug }),
                ));
            }
        }
    }

    Ok(categories)
}

fn validate_business(business: &BusinessInfo) -> Result<(), DomainError> {
    let required = [
        ("business_name", &business.business_name),
        ("business_description", &business.business_description),
        ("contact_email", &business.contact_email),
        ("contact_phone", &business.contact_phone),
        ("address", &business.address),
    ];

    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

    if !missing.is_empty() {
        return Err(DomainError::validation_with_details(
            "MISSING_FIELDS",
            "required business fields are missing",
            serde_json::json!({ "fields": missing }),
        ));
    }

    if !EMAIL_RE.is_match(business.contact_email.trim()) {
        return Err(DomainError::validation_with_details(
            "INVALID_EMAIL",
            "contact email is not well-formed",
            serde_json::json!({ "field": "contact_email" }),
        ));
    }

    Ok(())
}

/// Repository for vendor application persistence.
pub struct VendorApplicationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VendorApplicationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Validate and persist a pending application.
    ///
    /// Multiple pending applications per identity are allowed; each review
    /// happens independently.
    pub async fn submit(
        &self,
        identity_id: Uuid,
        category_slugs: &[String],
        business: BusinessInfo,
    ) -> Result<vendor_application::Model, DomainError> {
        let categories = validate_categories(category_slugs)?;
        validate_business(&business)?;

        let slugs: Vec<&str> = categories.iter().map(Category::as_str).collect();
        let now = Utc::now();

        let row = vendor_application::ActiveModel {
            id: Set(Uuid::new_v4()),
            identity_id: Set(identity_id),
            categories: Set(serde_json::json!(slugs)),
            business_name: Set(business.business_name),
            business_description: Set(business.business_description),
            contact_email: Set(business.contact_email.trim().to_string()),
            contact_phone: Set(business.contact_phone),
            address: Set(business.address),
            website: Set(business.website),
            verification_data: Set(business.verification_data),
            status: Set(ApplicationStatus::Pending),
            reviewer_id: Set(None),
            reviewed_at: Set(None),
            admin_notes: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        row.insert(self.db).await.map_err(store_error)
    }

    pub async fn find_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<vendor_application::Model>, DomainError> {
        vendor_application::Entity::find_by_id(application_id)
            .one(self.db)
            .await
            .map_err(store_error)
    }

    /// Conditionally move a pending application into a terminal status.
    ///
    /// The `status = 'pending'` filter makes this a compare-and-set: under
    /// concurrent reviews exactly one caller observes `true`. Losers must
    /// re-read the row to find out what won.
    pub async fn mark_reviewed(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
        reviewer_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<bool, DomainError> {
        let now = Utc::now();

        let update = vendor_application::ActiveModel {
            status: Set(status),
            reviewer_id: Set(Some(reviewer_id)),
            reviewed_at: Set(Some(now.into())),
            admin_notes: Set(admin_notes),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let result = vendor_application::Entity::update_many()
            .set(update)
            .filter(vendor_application::Column::Id.eq(application_id))
            .filter(vendor_application::Column::Status.eq(ApplicationStatus::Pending))
            .exec(self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Oldest-first batch of approved applications, for the reconciliation
    /// sweep.
    pub async fn list_approved(
        &self,
        limit: u64,
    ) -> Result<Vec<vendor_application::Model>, DomainError> {
        vendor_application::Entity::find()
            .filter(vendor_application::Column::Status.eq(ApplicationStatus::Approved))
            .order_by_asc(vendor_application::Column::ReviewedAt)
            .limit(limit)
            .all(self.db)
            .await
            .map_err(store_error)
    }
}
