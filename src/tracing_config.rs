//! Subscriber setup for the command-line tool
//!
//! The library only emits events. Everything is written to stderr so that
//! stdout stays free for image data.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable whose directives replace the `-v` level
pub const LOG_ENV_VAR: &str = "RUST_LOG";

/// How log lines are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Colored single-line output
    #[default]
    Console,
    /// Plain single-line output for CI logs
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

#[derive(Debug, Default)]
pub struct TracingConfig {
    /// Number of `-v` flags
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Filter directives, taking precedence over `verbosity`
    pub env_filter: Option<String>,
    pub session_id: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Use explicit filter directives; blank strings are ignored
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        let filter = filter.into();
        if !filter.trim().is_empty() {
            self.env_filter = Some(filter);
        }
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Directives handed to the `EnvFilter`
    #[must_use]
    pub fn filter_directives(&self) -> &str {
        if let Some(filter) = &self.env_filter {
            return filter;
        }
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// Invalid filter directives or a subscriber that is already installed.
    pub fn init(self) -> anyhow::Result<()> {
        let registry = Registry::default().with(EnvFilter::try_new(self.filter_directives())?);

        match self.format {
            TracingFormat::Console | TracingFormat::Compact => {
                let layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(self.format == TracingFormat::Console)
                    .with_target(false)
                    .compact();
                registry.with(layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "Session started");
        }
        Ok(())
    }
}

/// Install the CLI subscriber and return the new session id
///
/// A non-empty `RUST_LOG` overrides the `-v` level.
///
/// # Errors
/// See [`TracingConfig::init`].
pub fn init_cli_tracing(verbosity: u8, format: TracingFormat) -> anyhow::Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_session_id(session_id.clone());
    if let Ok(filter) = std::env::var(LOG_ENV_VAR) {
        config = config.with_env_filter(filter);
    }
    config.init()?;
    Ok(session_id)
}

pub mod spans {
    use tracing::{info_span, Span};

    pub fn session(session_id: &str, mode: &str) -> Span {
        info_span!("session", session_id = %session_id, mode = %mode)
    }

    pub fn file_processing(file_path: &std::path::Path, format: &str) -> Span {
        info_span!("file_processing", file_path = %file_path.display(), format = %format)
    }

    pub fn batch_processing(file_count: usize) -> Span {
        info_span!("batch_processing", file_count)
    }
}

pub mod events {
    /// Outcome of a batch run
    pub fn batch_summary(processed: usize, failed: usize, total_ms: u64) {
        tracing::info!(processed, failed, total_ms, "Batch complete");
    }
}
