//! Selection and dispatch: turns extracted metadata plus request options into
//! one live delivery strategy.

use std::sync::Arc;

use tracing::debug;

use crate::{
    config::Settings,
    error::StreamError,
    format,
    metadata::{ResourceMetadata, StreamOptions},
    quality::{self, Selection},
    stream::{DeliveryStream, LiveStream, SeekableStream, SequentialStream},
    transport::{HttpTransport, StreamTransport, TransportError},
};

/// Single entry point of the crate. Holds the transport collaborator and the
/// resolver-wide settings; each `resolve` call is independent and carries no
/// shared mutable state.
pub struct StreamResolver {
    transport: Arc<dyn StreamTransport>,
    settings: Settings,
}

impl StreamResolver {
    pub fn new(transport: Arc<dyn StreamTransport>, settings: Settings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Convenience constructor wiring up the reqwest-based transport.
    pub fn with_http(settings: Settings) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpTransport::new(&settings)?);
        Ok(Self::new(transport, settings))
    }

    /// Resolves one playable delivery strategy for the resource, or fails
    /// with a typed error. Classification, selection and dispatch are
    /// synchronous; the only suspension points are the reachability probe and
    /// the sequential-path content-length probe.
    pub async fn resolve(
        &self,
        metadata: &ResourceMetadata,
        options: &StreamOptions,
    ) -> Result<DeliveryStream, StreamError> {
        // Checked ahead of everything else; nothing is probed for a resource
        // with no encodings at all (e.g. an upcoming premiere).
        let Some(last_raw) = metadata.formats.last() else {
            return Err(StreamError::NotStreamable);
        };

        let options = options.normalize(&self.settings)?;

        if metadata.is_live && metadata.duration_secs == 0 {
            if let Some(manifest_url) = &metadata.manifest_url {
                // Live manifests are not per-encoding; the last raw
                // descriptor rides along for its type information only.
                debug!("resolving {} as live ({})", metadata.url, manifest_url);
                return Ok(DeliveryStream::Live(LiveStream::new(
                    self.transport.clone(),
                    last_raw.clone(),
                    manifest_url.clone(),
                    metadata.url.clone(),
                    options.precache_secs,
                    self.settings.live_poll_interval(),
                )));
            }
        }

        let encodings = format::classify(&metadata.formats);
        let encodings = format::narrow_by_language(encodings, options.language.as_deref());
        let selection = quality::select(encodings, last_raw, options.quality);

        self.probe_origin(selection.descriptor().url.as_str()).await?;

        if let Selection::Audio(encoding) = &selection {
            if encoding.is_webm_opus() {
                if !options.compat_mode {
                    debug!(
                        "resolving {} as seekable webm/opus (bitrate={:?})",
                        metadata.url, encoding.descriptor.bitrate
                    );
                    let stream = SeekableStream::new(
                        self.transport.clone(),
                        encoding,
                        metadata.duration_secs,
                        &metadata.url,
                        &options,
                    )?;
                    return Ok(DeliveryStream::Seekable(stream));
                }

                if options.seek_secs != 0 {
                    return Err(StreamError::UnsupportedOperation {
                        message: "seeking is disabled in compatibility mode".to_string(),
                    });
                }
                // Compatibility mode still yields a playable stream, just
                // without range addressing.
            }
        }

        self.sequential(metadata, selection).await
    }

    async fn sequential(
        &self,
        metadata: &ResourceMetadata,
        selection: Selection,
    ) -> Result<DeliveryStream, StreamError> {
        let descriptor = selection.into_descriptor();

        let content_length = match descriptor.content_length {
            Some(length) => length,
            None => {
                let length = self.transport.content_length(&descriptor.url).await?;
                debug!("probed content length for {}: {}", descriptor.url, length);
                length
            }
        };

        debug!(
            "resolving {} as sequential ({}, {} bytes)",
            metadata.url, descriptor.mime_type, content_length
        );
        Ok(DeliveryStream::Sequential(SequentialStream::new(
            self.transport.clone(),
            &descriptor,
            metadata.duration_secs,
            content_length,
            &metadata.url,
        )))
    }

    /// One-shot reachability check against the encoding's origin host, not
    /// the full resource URL.
    async fn probe_origin(&self, encoding_url: &str) -> Result<(), StreamError> {
        let probe_url = origin_probe_url(encoding_url, &self.settings.probe_path)
            .ok_or_else(|| StreamError::ResourceUnavailable {
                url: encoding_url.to_string(),
                source: TransportError::Invalid("encoding URL has no origin".to_string()),
            })?;

        self.transport
            .probe(&probe_url)
            .await
            .map_err(|source| StreamError::ResourceUnavailable {
                url: probe_url,
                source,
            })
    }
}

/// `scheme://host[:port]` of the encoding URL joined with the probe path.
fn origin_probe_url(encoding_url: &str, probe_path: &str) -> Option<String> {
    let url = reqwest::Url::parse(encoding_url).ok()?;
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Some(format!("{origin}{probe_path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_url_targets_origin_host() {
        assert_eq!(
            origin_probe_url("https://cdn.example.com/videoplayback?id=1", "/generate_204"),
            Some("https://cdn.example.com/generate_204".to_string())
        );
        assert_eq!(
            origin_probe_url("http://cdn.example.com:8080/a/b", "/ping"),
            Some("http://cdn.example.com:8080/ping".to_string())
        );
        assert_eq!(origin_probe_url("not a url", "/generate_204"), None);
    }
}
