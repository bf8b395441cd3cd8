//! Telemetry: global tracing/logging setup and request-scoped trace context.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, fmt, layer::Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

/// Trace context carrying the request correlation ID.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static ACTIVE_TRACE_CONTEXT: TraceContext;
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize global tracing exactly once, routing `log::` macros through
/// the tracing pipeline. Safe to call repeatedly (tests share a process).
pub fn init_tracing(config: &AppConfig) {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }

    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        // Another component (or a test harness) may already have installed a
        // logger; legacy `log::` output then bypasses tracing but the service
        // keeps working.
        eprintln!("Warning: log tracer bridge not installed: {}", err);
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!(
            "Warning: global tracing subscriber not installed: {}. Existing subscriber remains in effect.",
            err
        );
    }
}

/// Run `future` with the given trace context available through task-local
/// storage for the duration of the request.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_TRACE_CONTEXT.scope(context, future).await
}

/// The trace ID of the running task, if one has been set.
pub fn current_trace_id() -> Option<String> {
    ACTIVE_TRACE_CONTEXT
        .try_with(|ctx| ctx.trace_id.clone())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trace_id_visible_only_inside_scope() {
        assert!(current_trace_id().is_none());

        let ctx = TraceContext {
            trace_id: "trace-123".to_string(),
        };
        let seen = with_trace_context(ctx, async { current_trace_id() }).await;

        assert_eq!(seen.as_deref(), Some("trace-123"));
        assert!(current_trace_id().is_none());
    }
}
