use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Installs the global tracing subscriber.
///
/// Safe to call more than once; only the first call wins. `RUST_LOG` overrides
/// the default `info` filter. `json` switches to one JSON object per line for
/// log shippers.
pub fn init_logger(service_name: &'static str, json: bool) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let base = fmt::layer()
            .with_target(true) // <-- shows crate/module path
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(base.json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(base.pretty())
                .init();
        }

        tracing::info!(service = service_name, json, "logger initialized");
    });
}
