use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `ENVIRONMENT=production` logs JSON,
/// anything else logs pretty output. `RUST_LOG` wins over the defaults.
pub fn init_logging() {
    let env = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let default_filter = match env.as_str() {
        "production" => "info,lofi_radio=debug",
        "development" => "debug",
        _ => "info",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (tests, embedded use) keeps the first subscriber.
    let result = if env == "production" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_ids(true)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!("Logging initialised ({})", env);
    }
}
