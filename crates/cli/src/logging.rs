//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber so stdout stays the conversation.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` when verbose.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
