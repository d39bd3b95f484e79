//! Log output for the CLI.
//!
//! Logs go to stderr so stdout stays clean for the grid. A non-empty
//! `RUST_LOG` decides the filter on its own; otherwise `-v` flags pick the
//! level (none: warn, `-v`: info, `-vv`: debug, more: trace).

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Build the filter from `-v` count and the `RUST_LOG` value, if any.
///
/// Directives that fail to parse are reported on stderr and the verbosity
/// level is used instead.
pub fn filter(verbosity: u8, rust_log: Option<&str>) -> EnvFilter {
    let fallback = || EnvFilter::default().add_directive(level_for(verbosity).into());
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("ignoring invalid RUST_LOG '{}': {}", directives, e);
            fallback()
        }),
        None => fallback(),
    }
}

/// Install the global subscriber.
pub fn init(verbosity: u8) {
    let rust_log = std::env::var("RUST_LOG").ok();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter(verbosity, rust_log.as_deref()))
        .with(fmt_layer)
        .init();
}
