//! # Marketplace Accounts Library
//!
//! This library provides the core functionality for the marketplace accounts
//! service: the vendor provisioning saga, the approval cascade, and the HTTP
//! surface in front of them.

pub mod approval;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod notify;
pub mod provisioning;
pub mod reconciliation;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
