//! Seam to the HTTP transport collaborator.
//!
//! The resolver and the delivery strategies only talk to [`StreamTransport`];
//! the production implementation rides on `reqwest` in [`http`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub mod http;

pub use http::HttpTransport;

/// Byte-producing handle returned by a fetch. Chunk boundaries carry no
/// meaning; consumers treat the concatenation as one continuous stream.
pub type ByteChunks = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("{0}")]
    Invalid(String),
}

/// One-shot transport operations. No retries happen at this layer; retry
/// policy belongs to whoever wraps the resolution call.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Lightweight reachability check against a probe endpoint.
    async fn probe(&self, url: &str) -> Result<(), TransportError>;

    /// Opens a (possibly ranged) fetch starting at `offset`, reading `limit`
    /// bytes when bounded.
    async fn fetch(
        &self,
        url: &str,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<ByteChunks, TransportError>;

    /// Resolves the declared length of a resource.
    async fn content_length(&self, url: &str) -> Result<u64, TransportError>;

    /// Fetches a small text resource, e.g. a live manifest.
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError>;
}
