use std::num::ParseIntError;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The exposition port was set but does not parse as a TCP port.
    #[error("invalid metrics port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// A metric family clashed with something already in the registry.
    #[error("metrics registration: {0}")]
    Registry(#[from] prometheus::Error),
}
