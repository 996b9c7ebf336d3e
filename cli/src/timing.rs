//! Log output for the `qrdesk` binary.
//!
//! The business and input crates log through `log`; those records reach the
//! subscriber below through its `tracing-log` bridge. `QRDESK_LOG` takes
//! `EnvFilter` directives (`qrdesk_business=trace`, ...) and overrides the
//! level picked from the flags. With `--timing`, each `#[instrument]`ed
//! command logs its duration when its span closes.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

pub const LOG_ENV: &str = "QRDESK_LOG";

/// Level used when `QRDESK_LOG` is unset. Span close events are INFO, so
/// `timing` needs at least that.
fn default_level(verbose: bool, timing: bool) -> LevelFilter {
    match (verbose, timing) {
        (true, _) => LevelFilter::DEBUG,
        (false, true) => LevelFilter::INFO,
        (false, false) => LevelFilter::WARN,
    }
}

/// Installs the global subscriber, writing to stderr so stdout stays free
/// for scan results and completion scripts.
pub fn init_tracing(verbose: bool, timing: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose, timing).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let span_events = if timing {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_span_events(span_events)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
