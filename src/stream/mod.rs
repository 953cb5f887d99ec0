//! The three delivery strategies and their shared capability surface.

use bytes::Bytes;

use crate::error::StreamError;

pub mod live;
pub mod manifest;
pub mod seekable;
pub mod sequential;

pub use live::LiveStream;
pub use seekable::SeekableStream;
pub use sequential::SequentialStream;

/// Tells downstream playback consumers which decoder path to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// WebM container carrying Opus; range addressable.
    WebmOpus,
    /// Anything else; delivered as an opaque byte stream.
    Arbitrary,
}

/// One resolved delivery strategy. Callers needing strategy-specific behavior
/// (re-seek on [`SeekableStream`]) match on the variant; the shared
/// operations are available here.
///
/// A stream is consumed by a single caller; concurrent consumption of one
/// instance is unsupported.
#[derive(Debug)]
pub enum DeliveryStream {
    Live(LiveStream),
    Seekable(SeekableStream),
    Sequential(SequentialStream),
}

impl DeliveryStream {
    pub fn kind(&self) -> StreamKind {
        match self {
            DeliveryStream::Live(s) => s.kind(),
            DeliveryStream::Seekable(s) => s.kind(),
            DeliveryStream::Sequential(s) => s.kind(),
        }
    }

    /// Total byte length, when bounded. `None` for live streams.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            DeliveryStream::Live(_) => None,
            DeliveryStream::Seekable(s) => s.content_length(),
            DeliveryStream::Sequential(s) => Some(s.content_length()),
        }
    }

    /// Pulls the next chunk of playable bytes. `Ok(None)` marks the end of a
    /// bounded stream or a closed one.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        match self {
            DeliveryStream::Live(s) => s.next_chunk().await,
            DeliveryStream::Seekable(s) => s.next_chunk().await,
            DeliveryStream::Sequential(s) => s.next_chunk().await,
        }
    }

    /// Releases the underlying transport resources. Idempotent; cancels any
    /// in-flight fetch.
    pub async fn close(&mut self) {
        match self {
            DeliveryStream::Live(s) => s.close().await,
            DeliveryStream::Seekable(s) => s.close(),
            DeliveryStream::Sequential(s) => s.close(),
        }
    }
}
