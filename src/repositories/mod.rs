//! # Repository Layer
//!
//! Repository implementations encapsulating SeaORM operations for the
//! provisioning and approval entities.

pub mod user;
pub mod vendor_analytics;
pub mod vendor_application;
pub mod vendor_profile;

pub use user::{LinkStrategy, LinkUserRequest, UserRepository};
pub use vendor_analytics::{SeedOutcome, VendorAnalyticsRepository};
pub use vendor_application::{BusinessInfo, VendorApplicationRepository, validate_categories};
pub use vendor_profile::{ProfileOutcome, VendorProfileRepository};
