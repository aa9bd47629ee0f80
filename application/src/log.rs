//! Logging setup.

use std::{io, sync::OnceLock};

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt as _,
};

/// Most verbose [`Level`] being logged, once configured.
static MAX_LEVEL: OnceLock<Level> = OnceLock::new();

/// [`Level`] being logged until [`set_max_level()`] is called.
const DEFAULT_MAX_LEVEL: Level = Level::INFO;

/// Installs the global logger.
///
/// Warnings and errors are written to `stderr`, while everything else goes
/// to `stdout`.
///
/// # Panics
///
/// If a global logger is installed already.
pub fn init() {
    tracing_subscriber::registry()
        .with(output(io::stdout, |l| !is_alarming(l)))
        .with(output(io::stderr, is_alarming))
        .init();
}

/// Sets the most verbose [`Level`] to be logged.
///
/// Only the first call has effect.
pub fn set_max_level(level: Level) {
    _ = MAX_LEVEL.set(level);
}

/// Creates a compact formatting [`Layer`] writing the events of the
/// `accepted` [`Level`]s into the provided `writer`.
fn output<S, W>(writer: W, accepted: fn(Level) -> bool) -> impl Layer<S>
where
    S: Subscriber + for<'s> LookupSpan<'s>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            meta.is_span()
                || (accepted(*meta.level()) && is_enabled(*meta.level()))
        }))
}

/// Indicates whether the provided [`Level`] should be noticed by operators.
fn is_alarming(level: Level) -> bool {
    level == Level::WARN || level == Level::ERROR
}

/// Indicates whether events of the provided [`Level`] are logged.
fn is_enabled(level: Level) -> bool {
    MAX_LEVEL.get().copied().unwrap_or(DEFAULT_MAX_LEVEL) >= level
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::{is_alarming, is_enabled};

    #[test]
    fn warnings_and_errors_are_alarming() {
        assert!(is_alarming(Level::ERROR));
        assert!(is_alarming(Level::WARN));
        assert!(!is_alarming(Level::INFO));
        assert!(!is_alarming(Level::DEBUG));
        assert!(!is_alarming(Level::TRACE));
    }

    #[test]
    fn info_is_logged_by_default() {
        assert!(is_enabled(Level::ERROR));
        assert!(is_enabled(Level::INFO));
        assert!(!is_enabled(Level::DEBUG));
    }
}
