//! Single-pass delivery for encodings without range addressing.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use futures::StreamExt;

use super::StreamKind;
use crate::{
    error::StreamError,
    metadata::EncodingDescriptor,
    transport::{ByteChunks, StreamTransport},
};

/// Forward-only stream from offset zero to the resolved content length. The
/// only strategy whose length may come from a probe rather than the
/// descriptor; a transport failure mid-stream is terminal.
pub struct SequentialStream {
    transport: Arc<dyn StreamTransport>,
    url: String,
    resource_url: String,
    duration_secs: u64,
    content_length: u64,
    delivered: u64,
    current: Option<ByteChunks>,
    finished: bool,
}

impl SequentialStream {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        descriptor: &EncodingDescriptor,
        duration_secs: u64,
        content_length: u64,
        resource_url: &str,
    ) -> Self {
        Self {
            transport,
            url: descriptor.url.clone(),
            resource_url: resource_url.to_string(),
            duration_secs,
            content_length,
            delivered: 0,
            current: None,
            finished: false,
        }
    }

    pub fn kind(&self) -> StreamKind {
        StreamKind::Arbitrary
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        if self.finished || self.delivered >= self.content_length {
            return Ok(None);
        }

        if self.current.is_none() {
            let chunks = self
                .transport
                .fetch(&self.url, 0, Some(self.content_length))
                .await?;
            self.current = Some(chunks);
        }
        let Some(stream) = self.current.as_mut() else {
            return Ok(None);
        };

        match stream.next().await {
            Some(Ok(chunk)) => {
                self.delivered += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Some(Err(e)) => {
                // No resumability in this strategy.
                self.current = None;
                self.finished = true;
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
        self.finished = true;
        self.current = None;
    }
}

impl fmt::Debug for SequentialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialStream")
            .field("url", &self.url)
            .field("duration_secs", &self.duration_secs)
            .field("content_length", &self.content_length)
            .field("delivered", &self.delivered)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
