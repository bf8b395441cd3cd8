//! Applicant notification module
//!
//! Provides a shared notification abstraction so the provisioning and
//! approval flows can tell applicants what happened without depending on a
//! concrete mail transport. Dispatch is strictly fire-and-forget: delivery
//! failures are logged and never bubble into the caller's result.

pub mod default;

use async_trait::async_trait;
use uuid::Uuid;

/// Lifecycle event worth telling the applicant about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTemplate {
    /// Application received and queued for review
    ApplicationReceived { business_name: String },
    /// Application approved; the vendor account is live
    ApplicationApproved { business_name: String },
    /// Application rejected, with the reviewer's notes when present
    ApplicationRejected {
        business_name: String,
        reason: Option<String>,
    },
}

impl NotificationTemplate {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationTemplate::ApplicationReceived { .. } => "application_received",
            NotificationTemplate::ApplicationApproved { .. } => "application_approved",
            NotificationTemplate::ApplicationRejected { .. } => "application_rejected",
        }
    }
}

/// Trait for notification delivery implementations.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification to the given address.
    async fn send(
        &self,
        recipient: &str,
        template: &NotificationTemplate,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget dispatch wrapper used by the orchestrators. Logs the
/// outcome either way and always returns.
pub async fn dispatch(
    notifier: &dyn Notifier,
    identity_id: Uuid,
    recipient: &str,
    template: NotificationTemplate,
) {
    match notifier.send(recipient, &template).await {
        Ok(()) => {
            tracing::debug!(
                identity_id = %identity_id,
                kind = template.kind(),
                "Notification dispatched"
            );
        }
        Err(err) => {
            tracing::warn!(
                identity_id = %identity_id,
                kind = template.kind(),
                error = %err,
                "Notification delivery failed; continuing"
            );
            metrics::counter!("accounts_notification_failures_total", "kind" => template.kind())
                .increment(1);
        }
    }
}
