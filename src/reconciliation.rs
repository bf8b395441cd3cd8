//! # Reconciliation Sweep
//!
//! Background task that periodically repairs approved applications whose
//! cascade lagged: role still below vendor, missing profile, or missing
//! analytics seed. The approval status flip is authoritative, so every
//! cascade step is safe to rerun here until the dependent records agree
//! with it.

use std::sync::Arc;

use metrics::{counter, histogram};
use rand::Rng;
use sea_orm::DatabaseConnection;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::approval::ApprovalOrchestrator;
use crate::config::AppConfig;
use crate::error::DomainError;
use crate::models::user::UserRole;
use crate::notify::Notifier;
use crate::repositories::{
    UserRepository, VendorAnalyticsRepository, VendorApplicationRepository, VendorProfileRepository,
};

/// Background cascade repair service.
pub struct ReconciliationService {
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Default)]
struct SweepStats {
    applications_checked: u64,
    applications_repaired: u64,
}

impl ReconciliationService {
    pub fn new(
        config: Arc<AppConfig>,
        db: DatabaseConnection,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            db,
            notifier,
        }
    }

    /// Run the sweep loop until the provided shutdown token fires. A tick
    /// interval of zero disables the sweep entirely.
    #[instrument(skip_all)]
    pub async fn run(&self, shutdown: CancellationToken) {
        let tick_seconds = self.config.reconcile.tick_seconds;
        if tick_seconds == 0 {
            info!("Reconciliation sweep disabled by configuration");
            return;
        }

        info!(tick_seconds, "Starting reconciliation sweep");
        let tick_interval = TokioDuration::from_secs(tick_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reconciliation sweep shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let jitter_seconds = self.compute_jitter();
                    if jitter_seconds > 0 {
                        debug!(jitter_seconds, "Applying jitter before reconciliation tick");
                        sleep(TokioDuration::from_secs(jitter_seconds)).await;
                    }

                    let tick_started = std::time::Instant::now();
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "Reconciliation tick failed");
                    }
                    histogram!("accounts_reconcile_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Reconciliation sweep stopped");
    }

    /// Execute one sweep over a bounded batch of approved applications.
    #[instrument(skip_all)]
    pub async fn tick(&self) -> Result<(), DomainError> {
        let mut stats = SweepStats::default();

        let approved = VendorApplicationRepository::new(&self.db)
            .list_approved(self.config.reconcile.batch_size)
            .await?;

        for application in &approved {
            stats.applications_checked += 1;
            if self.needs_repair(application).await? {
                info!(
                    application_id = %application.id,
                    identity_id = %application.identity_id,
                    "Repairing lagged approval cascade"
                );
                ApprovalOrchestrator::new(self.db.clone(), self.notifier.clone())
                    .run_approval_cascade(application)
                    .await;
                stats.applications_repaired += 1;
                counter!("accounts_reconcile_repairs_total").increment(1);
            }
        }

        if stats.applications_repaired > 0 {
            info!(
                checked = stats.applications_checked,
                repaired = stats.applications_repaired,
                "Reconciliation tick complete"
            );
        } else {
            debug!(
                checked = stats.applications_checked,
                "Reconciliation tick found nothing to repair"
            );
        }

        Ok(())
    }

    /// An approved application needs repair when any dependent record lags
    /// the authoritative status.
    async fn needs_repair(
        &self,
        application: &crate::models::vendor_application::Model,
    ) -> Result<bool, DomainError> {
        let identity_id = application.identity_id;

        let role_lags = match UserRepository::new(&self.db)
            .find_by_identity(identity_id)
            .await?
        {
            Some(user) => !matches!(user.role, UserRole::Vendor | UserRole::Admin),
            // No user row to promote; nothing this sweep can do about it.
            None => false,
        };
        if role_lags {
            return Ok(true);
        }

        if VendorProfileRepository::new(&self.db)
            .find_by_identity(identity_id)
            .await?
            .is_none()
        {
            return Ok(true);
        }

        Ok(VendorAnalyticsRepository::new(&self.db)
            .find_by_identity(identity_id)
            .await?
            .is_none())
    }

    fn compute_jitter(&self) -> u64 {
        if self.config.reconcile.jitter_factor <= 0.0 {
            return 0;
        }

        let max_delay_seconds =
            (self.config.reconcile.tick_seconds as f64 * self.config.reconcile.jitter_factor) as u64;

        let mut rng = rand::thread_rng();
        rng.gen_range(0..=max_delay_seconds)
    }
}
