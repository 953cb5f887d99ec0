//! Picks exactly one encoding out of the classified audio sequence.

use crate::{
    format::AudioEncoding,
    metadata::EncodingDescriptor,
};

/// Outcome of quality selection: either a classified audio encoding, or the
/// last raw descriptor when nothing classified as audio (e.g. only combined
/// audio+video containers were available). The fallback is best-effort; it is
/// delivered sequentially and may not be audio-only.
#[derive(Debug, Clone)]
pub enum Selection {
    Audio(AudioEncoding),
    Fallback(EncodingDescriptor),
}

impl Selection {
    pub fn descriptor(&self) -> &EncodingDescriptor {
        match self {
            Selection::Audio(encoding) => &encoding.descriptor,
            Selection::Fallback(descriptor) => descriptor,
        }
    }

    pub fn into_descriptor(self) -> EncodingDescriptor {
        match self {
            Selection::Audio(encoding) => encoding.descriptor,
            Selection::Fallback(descriptor) => descriptor,
        }
    }

    /// True when the chosen encoding is a WebM/Opus rendition, the only
    /// combination delivered through byte-range seeking.
    pub fn is_webm_opus(&self) -> bool {
        matches!(self, Selection::Audio(e) if e.is_webm_opus())
    }
}

/// Selects one encoding for the requested quality index.
///
/// With no request the last (generally highest-quality) encoding wins.
/// Out-of-bounds indexes are clamped rather than rejected; `fallback` is the
/// last raw descriptor of the resource, used when classification yielded
/// nothing.
pub fn select(
    mut encodings: Vec<AudioEncoding>,
    fallback: &EncodingDescriptor,
    quality: Option<i64>,
) -> Selection {
    if encodings.is_empty() {
        tracing::debug!("no audio-only encodings, falling back to last raw descriptor");
        return Selection::Fallback(fallback.clone());
    }

    let last = encodings.len() - 1;
    let index = match quality {
        None => last,
        Some(q) if q <= 0 => 0,
        Some(q) => (q as usize).min(last),
    };

    Selection::Audio(encodings.remove(index))
}
