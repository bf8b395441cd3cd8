//! # Identity Provisioner
//!
//! Wraps the external identity store behind the [`IdentityProvider`] trait:
//! create an identity, delete it (compensation only), update credentials.
//! The identity is owned by the provider; the application only references it
//! by ID.

pub mod gotrue;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Request to create a new authentication principal upstream.
#[derive(Debug, Clone, Serialize)]
pub struct NewIdentity {
    pub email: String,
    /// Raw credential; hashing is the provider's concern.
    pub password: String,
    /// Free-form metadata bag. Write-once and informational only: the user
    /// record's role column is the authoritative role, never this bag.
    pub metadata: serde_json::Value,
}

/// Credential/metadata update for an existing identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdentityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Errors reported by identity provider implementations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityError {
    /// The email is already registered upstream.
    #[error("email is already registered")]
    Duplicate,
    /// Transport failure or backend fault; retryable with backoff.
    #[error("identity provider unavailable: {details}")]
    Unavailable { details: String },
}

impl From<IdentityError> for DomainError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::Duplicate => DomainError::DuplicateIdentity,
            IdentityError::Unavailable { details } => DomainError::ProviderUnavailable(details),
        }
    }
}

/// External identity store contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new identity. A successful call leaves a usable identity
    /// upstream until it is explicitly deleted.
    async fn create(&self, identity: NewIdentity) -> Result<Uuid, IdentityError>;

    /// Delete an identity. Idempotent: deleting a nonexistent identity
    /// succeeds.
    async fn delete(&self, identity_id: Uuid) -> Result<(), IdentityError>;

    /// Update credentials or email on an existing identity.
    async fn update(&self, identity_id: Uuid, update: IdentityUpdate) -> Result<(), IdentityError>;
}

/// Compensating delete used when a later saga step fails. Failures here are
/// logged and counted, never escalated: the original failure that triggered
/// compensation is what the caller must see.
pub async fn compensate_delete(provider: &dyn IdentityProvider, identity_id: Uuid) {
    match provider.delete(identity_id).await {
        Ok(()) => {
            tracing::info!(%identity_id, "compensation: identity deleted");
        }
        Err(err) => {
            metrics::counter!("accounts_compensation_failures_total", "step" => "delete_identity")
                .increment(1);
            tracing::error!(%identity_id, %err, "compensation: identity delete failed; orphan requires operator cleanup");
        }
    }
}
