//! Logging setup shared by the binaries.

use tracing_subscriber::fmt::format::FmtSpan;

/// Install the global fmt subscriber. DEBUG level when `debug` is set.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(debug: bool) {
    let log_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
}
