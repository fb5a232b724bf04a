//! dnsd-metrics: Prometheus instrumentation for the dnsd resolver.
//!
//! The resolver reports request counts, latency, response sizes, error
//! causes, and cache misses through one shared [`Metrics`] instance; the
//! exposition listener is off by default and starts when `PROMETHEUS_PORT`
//! is set.
//!
//! ```no_run
//! # fn main() -> dnsd_metrics::Result<()> {
//! let (metrics, _server) = dnsd_metrics::init_from_env()?;
//! metrics.record_request(dnsd_metrics::System::Recursive);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod labels;
pub mod registry;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use labels::{CacheType, Cause, Rcode, ResponseStat, System};
pub use registry::Metrics;
pub use server::ServerHandle;

use std::sync::Arc;

/// One-call bootstrap: read the environment, build the registry, start the
/// exposition listener when a port is configured. Needs a tokio runtime only
/// when the listener actually starts.
pub fn init_from_env() -> Result<(Arc<Metrics>, Option<ServerHandle>)> {
    let config = Config::from_env()?;
    let metrics = Arc::new(Metrics::new(&config)?);
    let handle = server::spawn(Arc::clone(&metrics), &config);
    Ok((metrics, handle))
}
