use tracing_subscriber::{fmt, EnvFilter};

/// Initialises the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info`, e.g.
/// `RUST_LOG=job_scheduler=debug,actix_web=info`. Records emitted through the
/// `log` facade (actix-web's request logger) are bridged into the subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// Test subscriber: debug level, captured by the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
