//! # Approval Orchestrator
//!
//! Drives the `pending -> approved|rejected` transition and the approval
//! cascade. The status flip is a conditional update checked by affected-row
//! count, so under concurrent reviews exactly one caller wins; losers re-read
//! the row and either replay idempotently (same decision already applied) or
//! report an invalid state.
//!
//! The status column is the source of truth. Every cascade step after the
//! flip is allowed to lag or fail independently; the reconciliation sweep
//! repairs stragglers later.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::user::UserRole;
use crate::models::vendor_application::{self, ApplicationStatus};
use crate::notify::{NotificationTemplate, Notifier, dispatch};
use crate::repositories::{
    UserRepository, VendorAnalyticsRepository, VendorApplicationRepository, VendorProfileRepository,
};

/// Review decision taken by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn terminal_status(self) -> ApplicationStatus {
        match self {
            Decision::Approve => ApplicationStatus::Approved,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Outcome of a review call.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub application: vendor_application::Model,
    /// Whether this call performed the transition or replayed one already done
    pub transitioned: bool,
}

/// Orchestrates review transitions and the approval cascade.
pub struct ApprovalOrchestrator {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl ApprovalOrchestrator {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Review an application.
    ///
    /// Approval runs the cascade after the status flip; rejection is a
    /// single atomic update. Replaying a decision already applied succeeds
    /// (and re-runs the conflict-tolerant cascade steps); attempting the
    /// opposite decision on a terminal row yields `InvalidState`.
    pub async fn review(
        &self,
        application_id: Uuid,
        decision: Decision,
        reviewer_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<ReviewOutcome, DomainError> {
        let repo = VendorApplicationRepository::new(&self.db);
        let target = decision.terminal_status();

        let won = repo
            .mark_reviewed(application_id, target, reviewer_id, admin_notes)
            .await?;

        let application = repo
            .find_by_id(application_id)
            .await?
            .ok_or(DomainError::ApplicationNotFound(application_id))?;

        if !won {
            if application.status != target {
                return Err(DomainError::InvalidState {
                    id: application_id,
                    status: application.status.as_str().to_string(),
                });
            }
            tracing::info!(
                application_id = %application_id,
                decision = ?decision,
                "Review replayed on already-decided application"
            );
        }

        if decision == Decision::Approve {
            self.run_approval_cascade(&application).await;
        }

        // Applicant notification only on the authoritative transition: a
        // replayed decision re-runs the conflict-tolerant cascade steps but
        // must not re-email the applicant.
        if won {
            let template = match decision {
                Decision::Approve => NotificationTemplate::ApplicationApproved {
                    business_name: application.business_name.clone(),
                },
                Decision::Reject => NotificationTemplate::ApplicationRejected {
                    business_name: application.business_name.clone(),
                    reason: application.admin_notes.clone(),
                },
            };
            dispatch(
                self.notifier.as_ref(),
                application.identity_id,
                &application.contact_email,
                template,
            )
            .await;
        }

        Ok(ReviewOutcome {
            application,
            transitioned: won,
        })
    }

    /// Best-effort cascade after an authoritative approval. Every step here
    /// tolerates failure and replays; none of them can undo the approval.
    /// The applicant notification is deliberately not part of the cascade:
    /// it belongs to the transition itself, so replays and reconciliation
    /// repairs run this silently.
    pub async fn run_approval_cascade(&self, application: &vendor_application::Model) {
        let identity_id = application.identity_id;

        match UserRepository::new(&self.db)
            .set_role_by_identity(identity_id, UserRole::Vendor)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    identity_id = %identity_id,
                    "Approval cascade found no user record to promote"
                );
                metrics::counter!("accounts_cascade_lag_total", "step" => "promote_role")
                    .increment(1);
            }
            Err(err) => {
                tracing::error!(
                    identity_id = %identity_id,
                    error = %err,
                    "Approval cascade role promotion failed; sweep will retry"
                );
                metrics::counter!("accounts_cascade_lag_total", "step" => "promote_role")
                    .increment(1);
            }
        }

        match VendorProfileRepository::new(&self.db)
            .create_from_application(application)
            .await
        {
            Ok(_) => {}
            Err(err) => {
                tracing::error!(
                    identity_id = %identity_id,
                    error = %err,
                    "Approval cascade profile creation failed; sweep will retry"
                );
                metrics::counter!("accounts_cascade_lag_total", "step" => "create_profile")
                    .increment(1);
            }
        }

        if let Err(err) = VendorAnalyticsRepository::new(&self.db).seed(identity_id).await {
            tracing::warn!(
                identity_id = %identity_id,
                error = %err,
                "Analytics seed failed; approval unaffected"
            );
            metrics::counter!("accounts_cascade_lag_total", "step" => "seed_analytics")
                .increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::default::RecordingNotifier;
    use crate::repositories::{BusinessInfo, LinkUserRequest};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectionTrait, Database, Statement};

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seeded_application(
        db: &DatabaseConnection,
        identity_id: Uuid,
    ) -> vendor_application::Model {
        UserRepository::new(db)
            .link_user(LinkUserRequest {
                identity_id,
                email: "vendor@example.test".to_string(),
                display_name: "Vendor".to_string(),
                phone: None,
                role: UserRole::Registered,
            })
            .await
            .unwrap();

        VendorApplicationRepository::new(db)
            .submit(
                identity_id,
                &["food".to_string()],
                BusinessInfo {
                    business_name: "Tidal Goods".to_string(),
                    business_description: "Coastal provisions".to_string(),
                    contact_email: "owner@tidalgoods.test".to_string(),
                    contact_phone: "+15550123".to_string(),
                    address: "1 Harbor Way".to_string(),
                    website: None,
                    verification_data: None,
                },
            )
            .await
            .unwrap()
    }

    fn orchestrator(db: &DatabaseConnection) -> (ApprovalOrchestrator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        (
            ApprovalOrchestrator::new(db.clone(), notifier.clone()),
            notifier,
        )
    }

    #[tokio::test]
    async fn approval_runs_full_cascade() {
        let db = setup_db().await;
        let identity_id = Uuid::new_v4();
        let application = seeded_application(&db, identity_id).await;
        let (orchestrator, notifier) = orchestrator(&db);
        let reviewer = Uuid::new_v4();

        let outcome = orchestrator
            .review(application.id, Decision::Approve, reviewer, None)
            .await
            .unwrap();

        assert!(outcome.transitioned);
        assert_eq!(outcome.application.status, ApplicationStatus::Approved);

        let user = UserRepository::new(&db)
            .find_by_identity(identity_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::Vendor);

        assert!(
            VendorProfileRepository::new(&db)
                .find_by_identity(identity_id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            VendorAnalyticsRepository::new(&db)
                .find_by_identity(identity_id)
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(notifier.sent()[0].1.kind(), "application_approved");
    }

    #[tokio::test]
    async fn replayed_approval_is_idempotent() {
        let db = setup_db().await;
        let identity_id = Uuid::new_v4();
        let application = seeded_application(&db, identity_id).await;
        let (orchestrator, notifier) = orchestrator(&db);
        let reviewer = Uuid::new_v4();

        orchestrator
            .review(application.id, Decision::Approve, reviewer, None)
            .await
            .unwrap();
        let replay = orchestrator
            .review(application.id, Decision::Approve, reviewer, None)
            .await
            .unwrap();

        assert!(!replay.transitioned);
        assert_eq!(replay.application.status, ApplicationStatus::Approved);

        // Still exactly one profile.
        assert!(
            VendorProfileRepository::new(&db)
                .find_by_identity(identity_id)
                .await
                .unwrap()
                .is_some()
        );

        // And exactly one applicant email: the replay re-ran the cascade
        // steps but only the authoritative transition notifies.
        let kinds: Vec<&'static str> = notifier.sent().iter().map(|(_, t)| t.kind()).collect();
        assert_eq!(kinds, vec!["application_approved"]);
    }

    #[tokio::test]
    async fn cross_decision_on_terminal_row_is_invalid_state() {
        let db = setup_db().await;
        let identity_id = Uuid::new_v4();
        let application = seeded_application(&db, identity_id).await;
        let (orchestrator, _) = orchestrator(&db);
        let reviewer = Uuid::new_v4();

        orchestrator
            .review(application.id, Decision::Approve, reviewer, None)
            .await
            .unwrap();

        let err = orchestrator
            .review(application.id, Decision::Reject, reviewer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn rejection_has_no_cascade() {
        let db = setup_db().await;
        let identity_id = Uuid::new_v4();
        let application = seeded_application(&db, identity_id).await;
        let (orchestrator, notifier) = orchestrator(&db);
        let reviewer = Uuid::new_v4();

        let outcome = orchestrator
            .review(
                application.id,
                Decision::Reject,
                reviewer,
                Some("incomplete verification".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.application.status, ApplicationStatus::Rejected);
        assert_eq!(
            outcome.application.admin_notes.as_deref(),
            Some("incomplete verification")
        );

        let user = UserRepository::new(&db)
            .find_by_identity(identity_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::Registered);
        assert!(
            VendorProfileRepository::new(&db)
                .find_by_identity(identity_id)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(notifier.sent()[0].1.kind(), "application_rejected");
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let db = setup_db().await;
        let (orchestrator, _) = orchestrator(&db);

        let err = orchestrator
            .review(Uuid::new_v4(), Decision::Approve, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ApplicationNotFound(_)));
    }

    #[tokio::test]
    async fn analytics_outage_never_blocks_approval() {
        let db = setup_db().await;
        let identity_id = Uuid::new_v4();
        let application = seeded_application(&db, identity_id).await;
        let (orchestrator, _) = orchestrator(&db);

        db.execute(Statement::from_string(
            db.get_database_backend(),
            "DROP TABLE vendor_analytics".to_string(),
        ))
        .await
        .unwrap();

        let outcome = orchestrator
            .review(application.id, Decision::Approve, Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(outcome.application.status, ApplicationStatus::Approved);
        assert!(
            VendorProfileRepository::new(&db)
                .find_by_identity(identity_id)
                .await
                .unwrap()
                .is_some()
        );
    }
}
