//! Log output for the `draftsmith` command.
//!
//! `run` prints its JSON report on stdout, so every log line goes to stderr.
//! Pipeline events from [`crate::obs`] carry the invocation id of the
//! enclosing `draftsmith.pipeline` span. `--json` makes them newline-delimited
//! JSON for a webhook relay to collect, `--verbose` lowers the draftsmith
//! level to DEBUG, and `RUST_LOG` overrides both.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Level for the draftsmith crates given the `--verbose` flag.
pub fn level_for_verbosity(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Filter used when `RUST_LOG` is unset: draftsmith at `level`, the HTTP
/// stack at WARN.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,draftsmith={level},draftsmith_core={level}")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}
