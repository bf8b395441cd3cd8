//! Default notifier implementations
//!
//! `LogNotifier` writes structured log lines instead of sending mail; it is
//! the implementation wired in by default until an outbound transport is
//! configured. `RecordingNotifier` captures sends in memory with failure
//! injection for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::notify::{NotificationTemplate, Notifier, NotifyError};

/// Notifier that logs the notification instead of delivering it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: &NotificationTemplate,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = recipient,
            kind = template.kind(),
            "Would send notification"
        );
        Ok(())
    }
}

/// In-memory notifier recording every send, with one-shot failure injection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    state: Mutex<RecordingState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<(String, NotificationTemplate)>,
    fail_next: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = true;
        }
    }

    pub fn sent(&self) -> Vec<(String, NotificationTemplate)> {
        self.state
            .lock()
            .map(|state| state.sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: &NotificationTemplate,
    ) -> Result<(), NotifyError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| NotifyError("recording state poisoned".to_string()))?;

        if state.fail_next {
            state.fail_next = false;
            return Err(NotifyError("injected delivery failure".to_string()));
        }

        state.sent.push((recipient.to_string(), template.clone()));
        Ok(())
    }
}
