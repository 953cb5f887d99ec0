use serde::{Deserialize, Serialize};

use crate::{config::Settings, error::StreamError};

/// Byte range boundaries as reported by the extractor (e.g. the cue index of a
/// WebM file, or its init header).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeEnd {
    #[serde(default)]
    pub start: u64,
    pub end: u64,
}

/// One available rendition of a resource, as produced by the external
/// extractor. Immutable for the duration of a resolution call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingDescriptor {
    /// Raw MIME descriptor, e.g. `audio/webm; codecs="opus"`.
    pub mime_type: String,
    /// Origin URL the bytes are fetched from.
    pub url: String,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub bitrate: Option<u64>,
    /// Range covering the seek index, when the container has one.
    #[serde(default)]
    pub index_range: Option<RangeEnd>,
    /// Range covering the initialization header.
    #[serde(default)]
    pub init_range: Option<RangeEnd>,
    /// Language of the audio track carried by this rendition, if reported.
    #[serde(default)]
    pub audio_track_language: Option<String>,
}

/// Everything stream resolution needs to know about one resource. Constructed
/// by the extractor, consumed once, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    /// Available encodings in extraction order. Not sorted by preference.
    #[serde(default)]
    pub formats: Vec<EncodingDescriptor>,
    #[serde(default)]
    pub is_live: bool,
    /// Live manifest endpoint, present for currently-live resources.
    #[serde(default)]
    pub manifest_url: Option<String>,
    /// Total duration in seconds; zero for live resources.
    #[serde(default)]
    pub duration_secs: u64,
    /// Canonical page URL of the resource.
    pub url: String,
}

/// Request-scoped stream configuration. One instance per resolution call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamOptions {
    /// Requested quality index into the classified audio encodings. Accepted
    /// as a float because callers hand it over from loosely-typed requests;
    /// anything non-integral is rejected.
    pub quality: Option<f64>,
    /// Start offset in seconds for seekable resources.
    pub seek_secs: Option<i64>,
    /// Preferred audio track language.
    pub language: Option<String>,
    /// Live precache window in seconds.
    pub precache_secs: Option<u64>,
    /// Compatibility mode: deliver sequentially even when the encoding could
    /// support byte-range seeking.
    pub compat_mode: bool,
}

/// Normalized, validated options. Produced once per call by
/// [`StreamOptions::normalize`]; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub quality: Option<i64>,
    pub seek_secs: i64,
    pub language: Option<String>,
    pub precache_secs: u64,
    pub compat_mode: bool,
}

impl StreamOptions {
    /// Validates and defaults the request options, returning a new value
    /// rather than touching the caller-owned one.
    pub fn normalize(&self, settings: &Settings) -> Result<ResolvedOptions, StreamError> {
        let quality = match self.quality {
            None => None,
            Some(q) if q.is_finite() && q.fract() == 0.0 => Some(q as i64),
            Some(q) => {
                return Err(StreamError::InvalidArgument {
                    message: format!("quality must be a whole number, got {q}"),
                });
            }
        };

        Ok(ResolvedOptions {
            quality,
            seek_secs: self.seek_secs.unwrap_or(0),
            language: self.language.clone(),
            precache_secs: self.precache_secs.unwrap_or(settings.default_precache_secs),
            compat_mode: self.compat_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_defaults_seek_to_zero() {
        let opts = StreamOptions::default();
        let resolved = opts.normalize(&Settings::default()).unwrap();
        assert_eq!(resolved.seek_secs, 0);
        assert_eq!(resolved.quality, None);
    }

    #[test]
    fn normalize_rejects_fractional_quality() {
        let opts = StreamOptions {
            quality: Some(2.5),
            ..Default::default()
        };
        assert!(matches!(
            opts.normalize(&Settings::default()),
            Err(StreamError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn normalize_accepts_whole_quality() {
        let opts = StreamOptions {
            quality: Some(3.0),
            ..Default::default()
        };
        let resolved = opts.normalize(&Settings::default()).unwrap();
        assert_eq!(resolved.quality, Some(3));
    }

    #[test]
    fn normalize_keeps_negative_quality_for_clamping() {
        let opts = StreamOptions {
            quality: Some(-2.0),
            ..Default::default()
        };
        let resolved = opts.normalize(&Settings::default()).unwrap();
        assert_eq!(resolved.quality, Some(-2));
    }

    #[test]
    fn descriptor_deserializes_from_extractor_json() {
        let descriptor: EncodingDescriptor = serde_json::from_str(
            r#"{
                "mimeType": "audio/webm; codecs=\"opus\"",
                "url": "https://cdn.example.com/a",
                "contentLength": 1000,
                "bitrate": 128000,
                "indexRange": { "start": 266, "end": 999 }
            }"#,
        )
        .unwrap();
        assert_eq!(descriptor.content_length, Some(1000));
        assert_eq!(descriptor.index_range.as_ref().map(|r| r.end), Some(999));
        assert!(descriptor.audio_track_language.is_none());
    }
}
