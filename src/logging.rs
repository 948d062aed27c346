use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt};

/// Logs to stderr so stdout stays clean for results. `RUST_LOG` overrides
/// the default `warn` level, e.g. `RUST_LOG=cut_grouper=debug`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Appends plain-text logs to `path`, defaulting to `info`.
pub fn init_file(path: impl AsRef<Path>) -> std::io::Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .init();
    Ok(())
}

/// For tests; a second call is a no-op.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
