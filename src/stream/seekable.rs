//! Range-addressable delivery for WebM/Opus encodings.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use futures::StreamExt;
use tracing::debug;

use super::StreamKind;
use crate::{
    error::StreamError,
    format::AudioEncoding,
    metadata::ResolvedOptions,
    transport::{ByteChunks, StreamTransport},
};

/// Bounded stream with a re-seekable byte cursor.
///
/// The cursor for a time offset is derived from the encoding's declared index
/// range (everything up to its end is header plus seek index) and bitrate.
/// A transport failure mid-stream drops the in-flight fetch only; the next
/// `next_chunk` re-issues a ranged fetch from the cursor.
pub struct SeekableStream {
    transport: Arc<dyn StreamTransport>,
    url: String,
    /// Canonical page URL of the resource, kept for diagnostics.
    resource_url: String,
    duration_secs: u64,
    content_length: Option<u64>,
    index_end: Option<u64>,
    bitrate: Option<u64>,
    cursor: u64,
    current: Option<ByteChunks>,
    finished: bool,
    closed: bool,
}

impl SeekableStream {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        encoding: &AudioEncoding,
        duration_secs: u64,
        resource_url: &str,
        options: &ResolvedOptions,
    ) -> Result<Self, StreamError> {
        let mut stream = Self {
            transport,
            url: encoding.descriptor.url.clone(),
            resource_url: resource_url.to_string(),
            duration_secs,
            content_length: encoding.descriptor.content_length,
            index_end: encoding.descriptor.index_range.as_ref().map(|r| r.end),
            bitrate: encoding.descriptor.bitrate,
            cursor: 0,
            current: None,
            finished: false,
            closed: false,
        };
        stream.seek_to(options.seek_secs)?;
        Ok(stream)
    }

    pub fn kind(&self) -> StreamKind {
        StreamKind::WebmOpus
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// Current byte cursor; the offset the next fetch would start from.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Moves the cursor to the byte offset for `seconds` and drops any
    /// in-flight fetch, so the next chunk comes from the new position.
    ///
    /// Valid offsets are `0..=duration-1`; everything else is rejected, on
    /// construction and on every later re-seek alike.
    pub fn seek_to(&mut self, seconds: i64) -> Result<(), StreamError> {
        if seconds < 0 || (seconds > 0 && seconds as u64 >= self.duration_secs) {
            return Err(StreamError::OutOfRange {
                requested: seconds,
                max: self.duration_secs.saturating_sub(1),
            });
        }

        self.cursor = self.byte_offset(seconds as u64);
        self.current = None;
        self.finished = false;
        debug!(
            "seek {} -> {}s (byte {})",
            self.resource_url, seconds, self.cursor
        );
        Ok(())
    }

    /// Maps a time offset to a byte offset. Offset zero always maps to byte
    /// zero so the container header is delivered.
    fn byte_offset(&self, seconds: u64) -> u64 {
        if seconds == 0 {
            return 0;
        }

        // Media bytes start right after the seek index; from there the
        // declared average bitrate approximates the target position.
        let media_start = self.index_end.map(|end| end + 1).unwrap_or(0);
        let offset = match self.bitrate {
            Some(bitrate) => media_start + seconds * bitrate / 8,
            None => media_start,
        };

        match self.content_length {
            Some(len) => offset.min(len.saturating_sub(1)),
            None => offset,
        }
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        if self.closed || self.finished {
            return Ok(None);
        }
        if let Some(len) = self.content_length {
            if self.cursor >= len {
                return Ok(None);
            }
        }

        if self.current.is_none() {
            let limit = self.content_length.map(|len| len - self.cursor);
            let chunks = self.transport.fetch(&self.url, self.cursor, limit).await?;
            self.current = Some(chunks);
        }
        let Some(stream) = self.current.as_mut() else {
            return Ok(None);
        };

        match stream.next().await {
            Some(Ok(chunk)) => {
                self.cursor += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Some(Err(e)) => {
                // Resume from the cursor on the next pull.
                self.current = None;
                Err(e.into())
            }
            None => {
                self.current = None;
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Idempotent; dropping the in-flight response cancels the fetch.
    pub fn close(&mut self) {
        self.closed = true;
        self.current = None;
    }
}

impl fmt::Debug for SeekableStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeekableStream")
            .field("url", &self.url)
            .field("duration_secs", &self.duration_secs)
            .field("content_length", &self.content_length)
            .field("cursor", &self.cursor)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
