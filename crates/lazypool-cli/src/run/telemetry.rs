//! # Logging
//!
//! Diagnostics go through `tracing` and are rendered by a
//! `tracing_subscriber::fmt` layer on **stderr**. Stdout is reserved for item
//! payloads, so piping the output of `lazypool` never mixes in log lines.
//!
//! Verbosity follows `RUST_LOG` (default `warn`), for example:
//!
//! ```bash
//! RUST_LOG=lazypool=debug lazypool --workers 4 tasks.txt
//! ```
//!
//! The engine's own events (worker spin-up, dispatch halts, run summary) are
//! emitted at `debug`/`info` through its `tracing` feature.

use super::config::LogFormat;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_target(false)
        .with_timer(ChronoLocal::rfc_3339())
        .with_file(true);

    match format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init()?,
        LogFormat::Compact => registry.with(layer.compact()).try_init()?,
        LogFormat::Json => registry.with(layer.json()).try_init()?,
    }

    Ok(())
}
