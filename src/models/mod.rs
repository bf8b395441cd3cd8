//! # Data Models
//!
//! This module contains all the data models used throughout the Marketplace
//! Accounts API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod user;
pub mod vendor_analytics;
pub mod vendor_application;
pub mod vendor_profile;

pub use user::Entity as User;
pub use vendor_analytics::Entity as VendorAnalytics;
pub use vendor_application::Entity as VendorApplication;
pub use vendor_profile::Entity as VendorProfile;

pub use user::UserRole;
pub use vendor_application::{ApplicationStatus, Category};
pub use vendor_profile::ProfileStatus;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "marketplace-accounts".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
