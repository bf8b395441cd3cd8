//! # Provisioning Saga
//!
//! The signup flow spans two resources that cannot share a transaction: the
//! external identity store and the local database. The saga runs the steps
//! in order and keeps an explicit compensation stack; when a step fails, the
//! stack is unwound in reverse so no identity survives a signup that never
//! completed.
//!
//! Compensation is best-effort. An undo that itself fails is logged and
//! counted, but the error reported to the caller is always the original
//! step failure.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::error::DomainError;
use crate::identity::{IdentityProvider, NewIdentity, compensate_delete};
use crate::models::user::{UserRecord, UserRole};
use crate::models::vendor_application;
use crate::notify::{NotificationTemplate, Notifier, dispatch};
use crate::repositories::{
    BusinessInfo, LinkStrategy, LinkUserRequest, UserRepository, VendorApplicationRepository,
    validate_categories,
};

/// Everything needed to provision a vendor account.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub categories: Vec<String>,
    pub business: BusinessInfo,
}

/// Result of a completed saga.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub identity_id: Uuid,
    pub user: UserRecord,
    pub link_strategy: LinkStrategy,
    pub application: vendor_application::Model,
}

/// Undo action for one completed saga step.
#[derive(Debug, Clone, Copy)]
enum Compensation {
    /// Remove the user row created by the link step
    RemoveUserRecord { user_id: Uuid },
    /// Delete the external identity created by the first step
    DeleteIdentity { identity_id: Uuid },
}

/// Orchestrates the identity + user + application signup steps.
pub struct ProvisioningSaga {
    db: DatabaseConnection,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ProvisioningSaga {
    pub fn new(
        db: DatabaseConnection,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            identity,
            notifier,
        }
    }

    /// Run the saga to completion or compensate back to a clean slate.
    ///
    /// The category set is validated up front so a malformed request is
    /// rejected before the identity store is touched. Business-field and
    /// email validation happen at the submission step; a violation there
    /// unwinds the identity and user record already created.
    pub async fn execute(&self, request: ProvisionRequest) -> Result<ProvisionOutcome, DomainError> {
        validate_categories(&request.categories)?;

        let mut compensations: Vec<Compensation> = Vec::with_capacity(2);

        let result = self.run_steps(&request, &mut compensations).await;

        match result {
            Ok(outcome) => {
                tracing::info!(
                    identity_id = %outcome.identity_id,
                    application_id = %outcome.application.id,
                    strategy = ?outcome.link_strategy,
                    "Vendor account provisioned"
                );

                dispatch(
                    self.notifier.as_ref(),
                    outcome.identity_id,
                    &request.email,
                    NotificationTemplate::ApplicationReceived {
                        business_name: outcome.application.business_name.clone(),
                    },
                )
                .await;

                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    steps_to_undo = compensations.len(),
                    "Provisioning failed; unwinding completed steps"
                );
                self.unwind(compensations).await;
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        request: &ProvisionRequest,
        compensations: &mut Vec<Compensation>,
    ) -> Result<ProvisionOutcome, DomainError> {
        // Step 1: external identity.
        let identity_id = self
            .identity
            .create(NewIdentity {
                email: request.email.clone(),
                password: request.password.clone(),
                metadata: serde_json::json!({
                    "role_at_signup": UserRole::Registered,
                    "signup_channel": "vendor_application",
                }),
            })
            .await?;
        compensations.push(Compensation::DeleteIdentity { identity_id });

        // Step 2: local user row, linked under whichever shape the schema has.
        let user_repo = UserRepository::new(&self.db);
        let (user, link_strategy) = user_repo
            .link_user(LinkUserRequest {
                identity_id,
                email: request.email.clone(),
                display_name: request.display_name.clone(),
                phone: request.phone.clone(),
                role: UserRole::Registered,
            })
            .await?;
        compensations.push(Compensation::RemoveUserRecord { user_id: user.id });

        // Step 3: pending vendor application.
        let application = VendorApplicationRepository::new(&self.db)
            .submit(identity_id, &request.categories, request.business.clone())
            .await?;

        Ok(ProvisionOutcome {
            identity_id,
            user,
            link_strategy,
            application,
        })
    }

    /// Unwind completed steps in reverse order. Each undo failure is logged
    /// and counted; unwinding always continues to the bottom of the stack.
    async fn unwind(&self, compensations: Vec<Compensation>) {
        for compensation in compensations.into_iter().rev() {
            match compensation {
                Compensation::RemoveUserRecord { user_id } => {
                    match UserRepository::new(&self.db).delete_by_id(user_id).await {
                        Ok(_) => {
                            tracing::info!(user_id = %user_id, "Compensated: user record removed");
                        }
                        Err(err) => {
                            tracing::error!(
                                user_id = %user_id,
                                error = %err,
                                "Compensation failed: user record not removed"
                            );
                            metrics::counter!(
                                "accounts_compensation_failures_total",
                                "step" => "remove_user_record"
                            )
                            .increment(1);
                        }
                    }
                }
                Compensation::DeleteIdentity { identity_id } => {
                    compensate_delete(self.identity.as_ref(), identity_id).await;
                }
            }
        }
    }
}
