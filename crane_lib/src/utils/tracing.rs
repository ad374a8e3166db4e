//! Tracing initialization shared by the console and the simulated backend.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable: crane crates at `info`, dependencies
/// such as `tungstenite` only at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "warn,crane_lib=info,crane_console=info,crane_sim=info";

/// Install a compact fmt subscriber for the current thread.
///
/// Both binaries run a current-thread tokio runtime, so a thread-local default covers every
/// task they spawn. Keep the returned guard alive for the lifetime of the program.
///
/// ```no_run
/// use crane_lib::init_tracing;
///
/// let _guard = init_tracing();
/// ```
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok());

    // Targets stay on so library and binary lines can be told apart
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}

fn log_filter(directives: Option<String>) -> EnvFilter {
    match directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        Some(Err(e)) => {
            eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
        None => EnvFilter::new(DEFAULT_LOG_FILTER),
    }
}
