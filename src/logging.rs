//! Log output for the command line programs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Compact logs on stderr, filtered by `RUST_LOG` (default `info`).
///
/// Under a scheduler stderr is the job's output log. Calling this twice is harmless.
pub fn init() {
    let env_filter = EnvFilter::builder().parse_lossy(
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "info".to_string()),
    );
    let fmt = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt).try_init();
}
