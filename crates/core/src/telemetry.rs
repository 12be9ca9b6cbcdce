use tracing_subscriber::{EnvFilter, fmt};

/// Default directives when `RUST_LOG` is unset. Query logging from sqlx is
/// kept at `warn` so per-block imports do not flood the output.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Initialise the global tracing subscriber from `RUST_LOG`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    fmt().with_env_filter(filter).with_target(true).init();
}
