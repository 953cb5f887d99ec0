//! Resolves a playable audio byte stream for a remote media resource out of
//! previously extracted metadata.
//!
//! Given a [`ResourceMetadata`] describing the available encodings, the
//! resolver picks the best audio-only encoding for the requested quality,
//! verifies its origin is reachable, and hands back one of three delivery
//! strategies: manifest-driven live streaming, range-seekable streaming for
//! WebM/Opus, or plain sequential streaming for everything else.
//!
//! ```no_run
//! use audiolink::{Settings, StreamOptions, StreamResolver};
//!
//! # async fn example(metadata: audiolink::ResourceMetadata) -> Result<(), audiolink::StreamError> {
//! let resolver = StreamResolver::with_http(Settings::default())?;
//! let mut stream = resolver.resolve(&metadata, &StreamOptions::default()).await?;
//! while let Some(_chunk) = stream.next_chunk().await? {
//!     // feed the chunk to the decoder picked via stream.kind()
//! }
//! stream.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Metadata extraction, URL decipherment and authentication happen upstream;
//! this crate starts where the extractor ends.

pub mod config;
pub mod error;
pub mod format;
pub mod metadata;
pub mod quality;
pub mod resolver;
pub mod stream;
pub mod transport;

pub use config::Settings;
pub use error::StreamError;
pub use format::AudioEncoding;
pub use metadata::{EncodingDescriptor, RangeEnd, ResourceMetadata, StreamOptions};
pub use resolver::StreamResolver;
pub use stream::{DeliveryStream, LiveStream, SeekableStream, SequentialStream, StreamKind};
pub use transport::{ByteChunks, HttpTransport, StreamTransport, TransportError};
