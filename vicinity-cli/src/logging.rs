//! Subscriber setup for the `vicinity` binary.
//!
//! Diagnostics go to stderr so query hits on stdout can be piped. `RUST_LOG`
//! picks the filter (default `info`) and `VICINITY_LOG_FORMAT` picks human or
//! JSON lines. Records sent through the `log` facade are forwarded as well.

use std::{env, ffi::OsString, io, str::FromStr, sync::OnceLock};

use thiserror::Error;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::format::FmtSpan,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
};

/// Environment variable selecting the [`LogFormat`].
pub const FORMAT_VAR: &str = "VICINITY_LOG_FORMAT";

const DEFAULT_DIRECTIVE: &str = "info";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Shape of each emitted line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    /// Plain text with span context.
    #[default]
    Human,
    /// One JSON object per event, carrying the span list.
    Json,
}

impl LogFormat {
    /// Reads [`FORMAT_VAR`], falling back to [`LogFormat::Human`] when unset.
    ///
    /// # Errors
    /// Returns [`LoggingError`] when the value is not UTF-8 or names no known
    /// format.
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_var(env::var_os(FORMAT_VAR))
    }

    fn from_var(value: Option<OsString>) -> Result<Self, LoggingError> {
        let Some(raw) = value else {
            return Ok(Self::default());
        };
        raw.into_string()
            .map_err(|rejected| LoggingError::NotUnicode {
                variable: FORMAT_VAR,
                value: rejected,
            })?
            .parse()
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("human") {
            Ok(Self::Human)
        } else if trimmed.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(LoggingError::UnknownFormat {
                value: trimmed.to_owned(),
            })
        }
    }
}

/// Reasons logging could not be configured.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The format variable held bytes that are not UTF-8.
    #[error("`{variable}` is not valid UTF-8: {value:?}")]
    NotUnicode {
        /// Variable that was read.
        variable: &'static str,
        /// Raw value as found in the environment.
        value: OsString,
    },
    /// The format variable named something other than `human` or `json`.
    #[error("`{value}` is not a log format; use `human` or `json`")]
    UnknownFormat {
        /// Trimmed value that was rejected.
        value: String,
    },
}

/// Installs the global subscriber once per process.
///
/// A subscriber registered by someone else is left in place and noted on
/// stderr; later calls return immediately.
///
/// # Errors
/// Returns [`LoggingError`] when [`FORMAT_VAR`] cannot be interpreted.
pub fn init_logging() -> Result<(), LoggingError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let format = LogFormat::from_env()?;
    if let Err(err) = install(format) {
        note_foreign_subscriber(&err);
    }
    INSTALLED.get_or_init(|| ());
    Ok(())
}

fn install(format: LogFormat) -> Result<(), TryInitError> {
    // Another logger may already own the `log` facade.
    let bridged = LogTracer::init().is_ok();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    tracing_subscriber::registry()
        .with(filter)
        .with(output_layer(format))
        .try_init()?;
    tracing::debug!(?format, bridged, "logging installed");
    Ok(())
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let lines = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    match format {
        LogFormat::Human => lines.boxed(),
        LogFormat::Json => lines
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    }
}

#[expect(
    clippy::print_stderr,
    reason = "the global subscriber belongs to someone else, so tracing cannot be used"
)]
fn note_foreign_subscriber(err: &TryInitError) {
    eprintln!("keeping the existing tracing subscriber: {err}");
}
