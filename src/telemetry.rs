use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Initialize tracing
///
/// `RUST_LOG` drives the filter (default `info`). Setting `LOG_FORMAT=json`
/// switches the formatter to line-delimited JSON for log shippers.
pub async fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Decide on layers
    let reg = Registry::default().with(env_filter);
    if json {
        reg.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        reg.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}
