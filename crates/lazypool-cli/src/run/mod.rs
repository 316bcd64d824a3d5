//! Command-line front end for the `lazypool` engine.
//!
//! ## Submodules
//!
//! - [`batch`] - Runs one batch end to end and decides the exit status.
//! - [`config`] - CLI arguments and their validation into a [`RunConfig`].
//! - [`delay`] - The "sleep for N ms, then echo" processor.
//! - [`report`] - Writes per-item outcomes to stdout/stderr.
//! - [`telemetry`] - `tracing` subscriber setup.
//!
//! [`RunConfig`]: config::RunConfig

pub mod batch;
pub mod config;
pub mod delay;
pub mod report;
pub mod telemetry;

#[cfg(test)]
mod tests;
