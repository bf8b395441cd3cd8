//! In-memory identity provider.
//!
//! Backs the local profile and the test suite. Supports failure injection so
//! saga compensation paths can be exercised without a real backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{IdentityError, IdentityProvider, IdentityUpdate, NewIdentity};

#[derive(Debug, Clone)]
struct StoredIdentity {
    email: String,
    password: String,
    #[allow(dead_code)]
    metadata: serde_json::Value,
}

#[derive(Debug, Default)]
struct State {
    identities: HashMap<Uuid, StoredIdentity>,
    fail_next_create: bool,
    fail_deletes: bool,
}

/// Identity provider holding all state in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    state: Mutex<State>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently stored.
    pub fn identity_count(&self) -> usize {
        self.state.lock().unwrap().identities.len()
    }

    /// Whether an identity with this ID exists.
    pub fn contains(&self, identity_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .identities
            .contains_key(&identity_id)
    }

    /// Whether the stored credential for this identity matches.
    pub fn credential_matches(&self, identity_id: Uuid, password: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .identities
            .get(&identity_id)
            .is_some_and(|identity| identity.password == password)
    }

    /// Whether an identity with this email exists.
    pub fn contains_email(&self, email: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .identities
            .values()
            .any(|identity| identity.email == email)
    }

    /// Make the next `create` call fail as unavailable.
    pub fn fail_next_create(&self) {
        self.state.lock().unwrap().fail_next_create = true;
    }

    /// Make every `delete` call fail as unavailable until cleared.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.state.lock().unwrap().fail_deletes = fail;
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create(&self, identity: NewIdentity) -> Result<Uuid, IdentityError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(IdentityError::Unavailable {
                details: "injected create failure".to_string(),
            });
        }

        if state
            .identities
            .values()
            .any(|existing| existing.email == identity.email)
        {
            return Err(IdentityError::Duplicate);
        }

        let id = Uuid::new_v4();
        state.identities.insert(
            id,
            StoredIdentity {
                email: identity.email,
                password: identity.password,
                metadata: identity.metadata,
            },
        );
        Ok(id)
    }

    async fn delete(&self, identity_id: Uuid) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_deletes {
            return Err(IdentityError::Unavailable {
                details: "injected delete failure".to_string(),
            });
        }

        // Idempotent: removing a missing identity is fine.
        state.identities.remove(&identity_id);
        Ok(())
    }

    async fn update(&self, identity_id: Uuid, update: IdentityUpdate) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();

        let Some(stored) = state.identities.get_mut(&identity_id) else {
            return Err(IdentityError::Unavailable {
                details: format!("identity {} does not exist", identity_id),
            });
        };

        if let Some(email) = update.email {
            stored.email = email;
        }
        if let Some(password) = update.password {
            stored.password = password;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password: "pw".to_string(),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let provider = InMemoryIdentityProvider::new();
        provider.create(identity("a@example.com")).await.unwrap();

        let result = provider.create(identity("a@example.com")).await;
        assert_eq!(result, Err(IdentityError::Duplicate));
        assert_eq!(provider.identity_count(), 1);
    }

    #[tokio::test]
    async fn delete_missing_identity_is_ok() {
        let provider = InMemoryIdentityProvider::new();
        assert!(provider.delete(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn update_applies_email_and_password() {
        let provider = InMemoryIdentityProvider::new();
        let id = provider.create(identity("a@example.com")).await.unwrap();

        provider
            .update(
                id,
                IdentityUpdate {
                    email: Some("b@example.com".to_string()),
                    password: Some("rotated".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(provider.contains_email("b@example.com"));
        assert!(!provider.contains_email("a@example.com"));
        assert!(provider.credential_matches(id, "rotated"));
        assert!(!provider.credential_matches(id, "pw"));
    }

    #[tokio::test]
    async fn injected_create_failure_fires_once() {
        let provider = InMemoryIdentityProvider::new();
        provider.fail_next_create();

        assert!(provider.create(identity("a@example.com")).await.is_err());
        assert!(provider.create(identity("a@example.com")).await.is_ok());
    }
}
