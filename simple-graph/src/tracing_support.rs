//! Tracing and logging support.
//!
//! The engine logs every session transition, escalation, dialog fallback
//! and graph call through `tracing`. This module installs a subscriber for
//! applications that do not bring their own.

#[cfg(feature = "tracing")]
pub use tracing::{self, debug, error, info, instrument, trace, warn};

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, util::TryInitError,
    EnvFilter, Layer,
};

/// Filter used when neither the config nor `RUST_LOG` sets one.
#[cfg(feature = "tracing")]
const DEFAULT_DIRECTIVES: &str = "info";

/// Tracing output format.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output.
    Pretty,

    /// One line per event.
    Compact,

    /// Newline-delimited JSON.
    Json,
}

/// Tracing configuration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directives such as `info,simple_graph_engine=debug`.
    ///
    /// If None, uses the RUST_LOG environment variable or defaults to "info".
    pub directives: Option<String>,

    pub format: TracingFormat,

    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    pub thread_ids: bool,
}

#[cfg(feature = "tracing")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            directives: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingConfig {
    /// Debug output from the engine, info for everything else.
    pub fn verbose() -> Self {
        Self {
            directives: Some("info,simple_graph_engine=debug".into()),
            ..Self::default()
        }
    }

    /// JSON lines with thread ids, for log shipping.
    pub fn json() -> Self {
        Self {
            format: TracingFormat::Json,
            thread_ids: true,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.directives {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
        }
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(self.target)
            .with_thread_ids(self.thread_ids);

        match (self.format, self.timestamps) {
            (TracingFormat::Pretty, true) => layer.pretty().boxed(),
            (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (TracingFormat::Compact, true) => layer.compact().boxed(),
            (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
            (TracingFormat::Json, true) => layer.json().boxed(),
            (TracingFormat::Json, false) => layer.json().without_time().boxed(),
        }
    }
}

/// Initialize the global subscriber with default settings.
///
/// Fails if a global subscriber is already installed.
///
/// # Example
///
/// ```ignore
/// use simple_graph::tracing_support::init_subscriber;
///
/// #[tokio::main]
/// async fn main() {
///     init_subscriber().ok();
///
///     // Your application code
/// }
/// ```
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - Enable debug logs
/// - `RUST_LOG=simple_graph_engine=trace` - Engine internals only
#[cfg(feature = "tracing")]
pub fn init_subscriber() -> Result<(), TryInitError> {
    init_subscriber_with_config(TracingConfig::default())
}

/// Initialize the global subscriber with custom configuration.
///
/// # Example
///
/// ```ignore
/// use simple_graph::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// let config = TracingConfig {
///     format: TracingFormat::Compact,
///     timestamps: false,
///     ..TracingConfig::verbose()
/// };
/// init_subscriber_with_config(config).ok();
/// ```
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(config.fmt_layer())
        .try_init()
}

// Fallback when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() -> Result<(), std::convert::Infallible> {
    Ok(())
}
