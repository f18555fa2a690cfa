//! Tracing subscriber setup for the `licensefp` binary and embedders.
//!
//! Library crates only emit `tracing` events; nothing is printed until one of
//! these initializers installs a subscriber. The filter comes from `RUST_LOG`
//! and falls back to `info`. Output goes to stderr so command output on
//! stdout stays machine-readable.

use std::sync::Once;

use tracing_subscriber::{
    EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a human-readable subscriber. Later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false)
            .with_thread_names(true);

        // Another subscriber may already be installed by the embedding program.
        if tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!("licensefp tracing initialized");
        }
    });
}

/// Install a JSON subscriber, one object per line. Later calls are no-ops.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_current_span(true);

        if tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!("licensefp tracing initialized (JSON mode)");
        }
    });
}
