//! Unified infrastructure error type.

use thiserror::Error as ThisError;

/// The error type returned by relay's fallible operations.
///
/// Failures inside a handler chain are never `Error`s: they are
/// [`Fault`](crate::Fault)s and always end up as a [`Response`](crate::Response).
/// This type surfaces what happens around dispatch: decoding a host event,
/// binding the local emulator to a port, accepting a connection.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("malformed event: {0}")]
    Event(#[from] serde_json::Error),
}
