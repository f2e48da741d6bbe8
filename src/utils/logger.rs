use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

const QUIET_FILTER: &str = "map_booking=info";
const VERBOSE_FILTER: &str = "map_booking=debug,info";

/// `RUST_LOG` wins over the built-in directives.
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn report(result: Result<(), TryInitError>) {
    if let Err(e) = result {
        eprintln!("map-booking: logging not initialised: {}", e);
    }
}

/// Human-readable, one event per line.
pub fn init_cli_logger(verbose: bool) {
    let filter = env_filter(if verbose { VERBOSE_FILTER } else { QUIET_FILTER });
    let layer = fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .compact();

    report(tracing_subscriber::registry().with(filter).with(layer).try_init());
}

/// JSON lines on stderr, with the current span flattened into each event.
pub fn init_json_logger() {
    let layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(std::io::stderr);

    report(
        tracing_subscriber::registry()
            .with(env_filter(QUIET_FILTER))
            .with(layer)
            .try_init(),
    );
}
