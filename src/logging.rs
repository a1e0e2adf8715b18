use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, logging to stderr at `level`.
///
/// `RUST_LOG` directives are applied on top of the level.
pub fn init(level: Level) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}
