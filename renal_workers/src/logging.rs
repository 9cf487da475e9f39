use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the tracing subscriber for a worker process.
///
/// Standard output carries the result envelope, so log lines go to standard
/// error. The level is fixed at `WARN` because workers take no configuration
/// from the environment. Calling this more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(LevelFilter::WARN)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init();
}
