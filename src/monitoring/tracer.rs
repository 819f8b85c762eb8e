/*!
 * Tracing Setup
 * Structured logging for guard lifecycles using the tracing crate
 */

use crate::config::GuardConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// `RUST_LOG` wins over `config.log_filter`. JSON output when
/// `config.json_logs` is set, compact human-readable output otherwise.
/// Calling this more than once keeps the first subscriber.
pub fn init_tracing(config: &GuardConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = config.json_logs, filter = %config.log_filter, "tracing initialized");
    }
}

/// Span covering one scoped unit of work
///
/// Logs its duration on drop and warns past the slow threshold.
pub struct ScopeSpan {
    span: tracing::Span,
    start: Instant,
    name: String,
    trace_id: Uuid,
    slow_after: Option<Duration>,
}

impl ScopeSpan {
    pub fn new(name: &str) -> Self {
        let trace_id = Uuid::new_v4();
        let span = span!(Level::DEBUG, "scope", trace_id = %trace_id, scope = name);
        debug!(parent: &span, scope = name, "scope entered");

        Self {
            span,
            start: Instant::now(),
            name: name.to_string(),
            trace_id,
            slow_after: crate::core::guard::slow_release_threshold(),
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ScopeSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        match self.slow_after {
            Some(threshold) if duration > threshold => warn!(
                trace_id = %self.trace_id,
                scope = %self.name,
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                slow = true,
                "slow scope detected"
            ),
            _ => debug!(
                trace_id = %self.trace_id,
                scope = %self.name,
                duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
                "scope exited"
            ),
        }
    }
}

/// Open a span for a named scope
pub fn span_scope(name: &str) -> ScopeSpan {
    ScopeSpan::new(name)
}
