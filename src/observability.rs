//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber.
///
/// `RUST_LOG` wins when set; otherwise only warnings are shown, or debug
/// output for this crate with `verbose`. Logs go to stderr so command output
/// on stdout stays machine-readable. Subsequent calls are no-ops.
pub fn init(verbose: bool) {
    let default = if verbose { "warn,purse=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
