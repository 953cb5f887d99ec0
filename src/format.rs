//! Classifies raw encoding descriptors into audio-only encodings.
//!
//! Extraction order is preserved and never treated as a preference order.
//! A descriptor the parser cannot make sense of is dropped on its own; one
//! malformed entry must not block delivery when others are valid.

use crate::metadata::EncodingDescriptor;

/// An [`EncodingDescriptor`] whose MIME descriptor identified it as audio,
/// refined with the parsed container and codec.
#[derive(Debug, Clone)]
pub struct AudioEncoding {
    pub descriptor: EncodingDescriptor,
    /// Compression scheme of the payload, e.g. `opus`.
    pub codec: String,
    /// Outer byte format, e.g. `webm`.
    pub container: String,
}

impl AudioEncoding {
    pub fn is_webm_opus(&self) -> bool {
        self.codec == "opus" && self.container == "webm"
    }
}

/// Filters the descriptor sequence down to parsable audio encodings,
/// preserving relative order.
pub fn classify(formats: &[EncodingDescriptor]) -> Vec<AudioEncoding> {
    formats
        .iter()
        .filter_map(|descriptor| match parse_audio_mime(&descriptor.mime_type) {
            Some((container, codec)) => Some(AudioEncoding {
                descriptor: descriptor.clone(),
                codec,
                container,
            }),
            None => {
                if descriptor.mime_type.starts_with("audio") {
                    tracing::debug!(
                        "skipping audio descriptor with unparsable mime: {}",
                        descriptor.mime_type
                    );
                }
                None
            }
        })
        .collect()
}

/// Narrows the classified sequence to the requested audio track language when
/// at least one encoding matches it; otherwise the full sequence is kept so a
/// missing translation never makes the resource unplayable.
pub fn narrow_by_language(
    encodings: Vec<AudioEncoding>,
    language: Option<&str>,
) -> Vec<AudioEncoding> {
    let Some(language) = language else {
        return encodings;
    };

    let any_match = encodings.iter().any(|e| {
        e.descriptor
            .audio_track_language
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(language))
    });
    if !any_match {
        return encodings;
    }

    encodings
        .into_iter()
        .filter(|e| {
            e.descriptor
                .audio_track_language
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(language))
        })
        .collect()
}

/// Parses `audio/<container>; codecs="<codec>"` into its two components.
///
/// Returns `None` for non-audio types and for audio descriptors missing the
/// `codecs` parameter, which is a contract violation of the upstream
/// extractor for that single entry.
fn parse_audio_mime(mime: &str) -> Option<(String, String)> {
    let mut parts = mime.split(';').map(str::trim);

    let essence = parts.next()?;
    let (kind, container) = essence.split_once('/')?;
    if kind != "audio" || container.is_empty() {
        return None;
    }

    let codec = parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim() != "codecs" {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })?;

    Some((container.to_string(), codec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(mime: &str) -> EncodingDescriptor {
        EncodingDescriptor {
            mime_type: mime.to_string(),
            url: "https://cdn.example.com/a".to_string(),
            content_length: None,
            bitrate: None,
            index_range: None,
            init_range: None,
            audio_track_language: None,
        }
    }

    #[test]
    fn parses_webm_opus() {
        let out = classify(&[descriptor("audio/webm; codecs=\"opus\"")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].container, "webm");
        assert_eq!(out[0].codec, "opus");
        assert!(out[0].is_webm_opus());
    }

    #[test]
    fn parses_mp4_aac() {
        let out = classify(&[descriptor("audio/mp4; codecs=\"mp4a.40.2\"")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].container, "mp4");
        assert_eq!(out[0].codec, "mp4a.40.2");
        assert!(!out[0].is_webm_opus());
    }

    #[test]
    fn drops_video_descriptors() {
        let out = classify(&[
            descriptor("video/mp4; codecs=\"avc1.4d401f\""),
            descriptor("audio/webm; codecs=\"opus\""),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].container, "webm");
    }

    #[test]
    fn drops_audio_without_codecs_param() {
        let out = classify(&[
            descriptor("audio/webm"),
            descriptor("audio/webm; codecs=\"\""),
            descriptor("audio/webm; codecs=\"opus\""),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn preserves_relative_order() {
        let out = classify(&[
            descriptor("audio/webm; codecs=\"opus\""),
            descriptor("video/webm; codecs=\"vp9\""),
            descriptor("audio/mp4; codecs=\"mp4a.40.2\""),
        ]);
        let containers: Vec<&str> = out.iter().map(|e| e.container.as_str()).collect();
        assert_eq!(containers, ["webm", "mp4"]);
    }

    #[test]
    fn output_never_longer_than_input() {
        let input = vec![
            descriptor("audio/webm; codecs=\"opus\""),
            descriptor("garbage"),
            descriptor("audio/ogg"),
        ];
        assert!(classify(&input).len() <= input.len());
    }

    #[test]
    fn language_narrowing_keeps_matches_only() {
        let mut en = descriptor("audio/webm; codecs=\"opus\"");
        en.audio_track_language = Some("en".to_string());
        let mut fr = descriptor("audio/webm; codecs=\"opus\"");
        fr.audio_track_language = Some("fr".to_string());

        let narrowed = narrow_by_language(classify(&[en, fr]), Some("fr"));
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].descriptor.audio_track_language.as_deref(), Some("fr"));
    }

    #[test]
    fn language_narrowing_is_best_effort() {
        let out = classify(&[descriptor("audio/webm; codecs=\"opus\"")]);
        let narrowed = narrow_by_language(out, Some("de"));
        assert_eq!(narrowed.len(), 1);
    }
}
