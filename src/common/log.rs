//! JSON-lines logging on top of `tracing`.
//!
//! Events carry `ev` (event name), `code` (a [`ServeCode`](super::ServeCode) value)
//! and `dur_ms` where a duration makes sense.

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{prelude::*, registry, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("failed to initialize log subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber writing to stderr. `RUST_LOG` takes precedence
/// over `default_filter`.
pub fn init(default_filter: &str) -> Result<(), LogInitError> {
    subscriber(filter(default_filter), std::io::stderr).try_init()?;
    Ok(())
}

/// Install the global subscriber unless the host already has one.
pub fn init_once(default_filter: &str) {
    // An existing subscriber belongs to the host; keep it.
    let _ = init(default_filter);
}

fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub(crate) fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_writer(writer);

    registry().with(filter).with(layer)
}
