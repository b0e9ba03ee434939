//! Logging surface (§6.7).
//!
//! This crate never installs a global `tracing` subscriber on its own — a
//! library must not steal the host process's logging configuration. This
//! module only offers an opt-in convenience installer for binaries, examples,
//! and tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `tracing_subscriber::fmt` layer driven by `RUST_LOG`, defaulting
/// to `info` when the variable is unset. Intended for binaries/tests, not for
/// use inside library code.
pub fn install_fmt_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
