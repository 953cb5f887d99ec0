//! Manifest-driven delivery for live resources.

use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    StreamKind,
    manifest::{self, Manifest, MediaPlaylist, Segment},
};
use crate::{
    error::StreamError,
    format,
    metadata::EncodingDescriptor,
    transport::{StreamTransport, TransportError},
};

const CHANNEL_CAPACITY: usize = 16;
const MAX_MANIFEST_HOPS: usize = 4;

/// Unbounded stream fed by a worker task that re-resolves the live manifest
/// on its own schedule, independent of consumer pace.
///
/// Not seekable. A segment fetch failure is recovered by re-resolving the
/// manifest on the next poll; a manifest failure is surfaced and terminal.
pub struct LiveStream {
    rx: mpsc::Receiver<Result<Bytes, StreamError>>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    descriptor: EncodingDescriptor,
    manifest_url: String,
    resource_url: String,
    kind: StreamKind,
    closed: bool,
}

impl LiveStream {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        descriptor: EncodingDescriptor,
        manifest_url: String,
        resource_url: String,
        precache_secs: u64,
        poll_interval: Duration,
    ) -> Self {
        let kind = format::classify(std::slice::from_ref(&descriptor))
            .first()
            .map(|e| {
                if e.is_webm_opus() {
                    StreamKind::WebmOpus
                } else {
                    StreamKind::Arbitrary
                }
            })
            .unwrap_or(StreamKind::Arbitrary);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(poll_loop(
            transport,
            manifest_url.clone(),
            precache_secs,
            poll_interval,
            tx,
            cancel.clone(),
        ));

        Self {
            rx,
            cancel,
            worker: Some(worker),
            descriptor,
            manifest_url,
            resource_url,
            kind,
            closed: false,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn descriptor(&self) -> &EncodingDescriptor {
        &self.descriptor
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        if self.closed {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Stops the worker and waits for it to wind down. Idempotent.
    pub async fn close(&mut self) {
        self.closed = true;
        self.cancel.cancel();
        self.rx.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStream")
            .field("manifest_url", &self.manifest_url)
            .field("kind", &self.kind)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Worker task: poll the manifest, stream segments newer than the last one
/// delivered, sleep, repeat. Runs until cancellation, `#EXT-X-ENDLIST`, or a
/// manifest failure.
async fn poll_loop(
    transport: Arc<dyn StreamTransport>,
    manifest_url: String,
    precache_secs: u64,
    poll_interval: Duration,
    tx: mpsc::Sender<Result<Bytes, StreamError>>,
    cancel: CancellationToken,
) {
    let mut last_sequence: Option<u64> = None;
    let mut init_sent = false;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let playlist = match resolve_media_playlist(&*transport, &manifest_url).await {
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("live manifest resolution failed for {}: {}", manifest_url, e);
                let _ = forward(&tx, Err(e.into()), &cancel).await;
                break;
            }
        };

        if !init_sent {
            if let Some(init) = &playlist.init {
                match stream_segment(&*transport, init, &tx, &cancel).await {
                    Ok(true) => {}
                    Ok(false) => return,
                    Err(e) => {
                        warn!("live init segment fetch failed: {}", e);
                    }
                }
            }
            init_sent = true;
        }

        let fresh: Vec<&Segment> = playlist
            .segments
            .iter()
            .filter(|s| last_sequence.is_none_or(|last| s.sequence > last))
            .collect();

        // First poll starts near the live edge: only the newest segments
        // covering the precache window. Later polls deliver everything new.
        let start = if last_sequence.is_none() {
            live_edge_start(&fresh, precache_secs)
        } else {
            0
        };

        for &segment in &fresh[start..] {
            match stream_segment(&*transport, segment, &tx, &cancel).await {
                Ok(true) => last_sequence = Some(segment.sequence),
                Ok(false) => return,
                Err(e) => {
                    // Recover by re-resolving the manifest next round.
                    warn!("live segment fetch failed ({}), re-resolving: {}", segment.url, e);
                    break;
                }
            }
        }

        if playlist.ended {
            debug!("live stream {} ended", manifest_url);
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(poll_interval) => {}
        }
    }
}

/// Follows master playlists down to a media playlist, bounded in depth.
async fn resolve_media_playlist(
    transport: &dyn StreamTransport,
    manifest_url: &str,
) -> Result<MediaPlaylist, TransportError> {
    let mut url = manifest_url.to_string();

    for _ in 0..MAX_MANIFEST_HOPS {
        let text = transport.fetch_text(&url).await?;
        match manifest::parse(&text, &url) {
            Manifest::Media(playlist) => return Ok(playlist),
            master => match master.best_variant() {
                Some(variant) => {
                    debug!("live manifest: following variant {}", variant);
                    url = variant.to_string();
                }
                None => {
                    return Err(TransportError::Invalid(format!(
                        "master playlist has no variants: {url}"
                    )));
                }
            },
        }
    }

    Err(TransportError::Invalid(format!(
        "manifest nesting too deep starting at {manifest_url}"
    )))
}

/// Index of the first segment to deliver so that the tail covers the precache
/// window. Always keeps at least the newest segment.
fn live_edge_start(fresh: &[&Segment], precache_secs: u64) -> usize {
    if fresh.is_empty() {
        return 0;
    }

    let mut covered = 0.0;
    for (i, segment) in fresh.iter().enumerate().rev() {
        covered += segment.duration_secs;
        if covered >= precache_secs as f64 {
            return i;
        }
    }
    0
}

/// Streams one segment through the channel. `Ok(false)` means the consumer is
/// gone or the stream was cancelled.
async fn stream_segment(
    transport: &dyn StreamTransport,
    segment: &Segment,
    tx: &mpsc::Sender<Result<Bytes, StreamError>>,
    cancel: &CancellationToken,
) -> Result<bool, TransportError> {
    let (offset, limit) = match &segment.range {
        Some(range) => (range.offset, Some(range.length)),
        None => (0, None),
    };

    let mut chunks = transport.fetch(&segment.url, offset, limit).await?;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(false),
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if !forward(tx, Ok(chunk), cancel).await {
                    return Ok(false);
                }
            }
            Some(Err(e)) => return Err(e),
            None => return Ok(true),
        }
    }
}

/// Sends one item unless the stream is cancelled or the receiver dropped.
async fn forward(
    tx: &mpsc::Sender<Result<Bytes, StreamError>>,
    item: Result<Bytes, StreamError>,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::manifest::Segment;

    fn segment(sequence: u64, duration_secs: f64) -> Segment {
        Segment {
            url: format!("https://live.example.com/seg{sequence}.webm"),
            sequence,
            duration_secs,
            range: None,
        }
    }

    #[test]
    fn live_edge_keeps_precache_window() {
        let segs = [
            segment(0, 2.0),
            segment(1, 2.0),
            segment(2, 2.0),
            segment(3, 2.0),
        ];
        let refs: Vec<&Segment> = segs.iter().collect();
        // 4 seconds of precache -> the last two segments.
        assert_eq!(live_edge_start(&refs, 4), 2);
    }

    #[test]
    fn live_edge_caps_at_playlist_start() {
        let segs = [segment(0, 2.0), segment(1, 2.0)];
        let refs: Vec<&Segment> = segs.iter().collect();
        assert_eq!(live_edge_start(&refs, 600), 0);
    }
}
