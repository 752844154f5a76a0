//! Structured logging setup and context propagation.
//!
//! Every component logs through `tracing`; records are JSON lines with
//! ISO-8601 UTC timestamps. Context fields are bound once on the pipeline
//! span and inherited by everything emitted inside it, so call sites never
//! pass `account_id`/`epoch_id` by hand.

use tracing::Span;
use tracing_subscriber::EnvFilter;

use crate::types::EpochId;

/// Install the global JSON subscriber. Call once at process startup; later
/// calls are no-ops so tests can invoke it freely.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init();
}

/// Span carrying the per-account pipeline context. Enter it (or instrument
/// the pipeline future with it) and every log record emitted inside carries
/// both fields.
pub fn pipeline_span(account_id: &str, epoch_id: EpochId) -> Span {
    tracing::info_span!("pipeline", account_id, epoch_id)
}
