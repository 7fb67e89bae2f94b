use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global tracing subscriber.
///
/// `LOG_LEVEL` accepts any `EnvFilter` directive (`info`, `educenter_backend=debug,actix_web=info`).
/// Records emitted through the `log` crate (actix-web's request logger) are bridged as well.
pub fn init(log_level: &str) {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_thread_ids(true);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .is_err()
    {
        eprintln!("⚠️  WARNING: a tracing subscriber is already installed");
    }
}
