use thiserror::Error;

use crate::transport::TransportError;

/// Terminal failures of a single stream-resolution call.
///
/// None of these are retried internally; a caller wanting retries wraps the
/// whole `resolve` call.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The resource reports no encodings at all, e.g. a premiere that has not
    /// gone live yet.
    #[error("resource has no streamable encodings")]
    NotStreamable,

    /// A request option failed validation before any selection work.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The reachability probe against the chosen encoding's origin failed.
    #[error("origin unreachable: {url}")]
    ResourceUnavailable {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Seek offset outside the valid bound for this resource.
    #[error("seek offset {requested}s outside valid range 0..={max}s")]
    OutOfRange { requested: i64, max: u64 },

    /// The requested operation is disabled in the current mode.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation { message: String },

    /// Transport failure while opening or consuming a stream.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
