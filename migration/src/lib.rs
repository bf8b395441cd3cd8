//! Database migrations for the Marketplace Accounts API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_05_01_000001_create_users;
mod m2026_05_01_000002_create_vendor_applications;
mod m2026_05_01_000003_create_vendor_profiles;
mod m2026_05_01_000004_create_vendor_analytics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_05_01_000001_create_users::Migration),
            Box::new(m2026_05_01_000002_create_vendor_applications::Migration),
            Box::new(m2026_05_01_000003_create_vendor_profiles::Migration),
            Box::new(m2026_05_01_000004_create_vendor_analytics::Migration),
        ]
    }
}
