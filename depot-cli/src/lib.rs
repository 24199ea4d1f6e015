//! Shared pieces of the `depot-publish` and `depot-update` executables.
//!
//! # Usage
//!
//! ```text
//! depot-publish <ROOT> [--track DIR]... [--exclude PATH]... [--dry-run] [--json] [-v]
//! depot-update  <ROOT> [--refresh] [--force] [--remote URL] [--json] [-v]
//! ```

pub mod commands;

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the stderr `tracing` subscriber.
///
/// `RUST_LOG` applies when no `-v` is given; otherwise one `-v` means `info`
/// and two or more mean `debug`.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
