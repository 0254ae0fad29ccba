//! Infrastructure error type.

use thiserror::Error;

/// The error type returned by restgate's fallible infrastructure operations.
///
/// Application-level failures (400, 422, 500, etc.) are expressed as
/// [`ApiError`](crate::ApiError) values returned from handlers, not as
/// `Error`s. This type surfaces failures outside any request: parsing the
/// listen address, binding to a port.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}
