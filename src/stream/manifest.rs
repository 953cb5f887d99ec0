//! Minimal live-manifest parser.
//!
//! Handles just enough of the m3u8 format for live audio delivery: master
//! playlists are reduced to their best variant, media playlists yield ordered
//! segments with sequence numbers, `#EXTINF` durations, optional
//! `#EXT-X-BYTERANGE` sub-ranges and an optional `#EXT-X-MAP` init segment.

#[derive(Clone, Debug, PartialEq)]
pub struct ByteRange {
    pub length: u64,
    pub offset: u64,
}

/// One fetchable piece of media.
#[derive(Clone, Debug)]
pub struct Segment {
    pub url: String,
    /// Media sequence number; strictly increasing within one stream.
    pub sequence: u64,
    /// Duration in seconds from `#EXTINF`. Zero for init segments.
    pub duration_secs: f64,
    pub range: Option<ByteRange>,
}

pub struct Variant {
    pub url: String,
    pub bandwidth: u64,
}

pub struct MediaPlaylist {
    /// Initialization segment, fetched once before any media segment.
    pub init: Option<Segment>,
    pub segments: Vec<Segment>,
    /// True when the playlist carries `#EXT-X-ENDLIST` (stream finished).
    pub ended: bool,
}

pub enum Manifest {
    /// Master playlist; the live worker re-resolves through the variant.
    Master(Vec<Variant>),
    Media(MediaPlaylist),
}

impl Manifest {
    /// Highest-bandwidth variant URL of a master playlist.
    pub fn best_variant(&self) -> Option<&str> {
        match self {
            Manifest::Master(variants) => variants
                .iter()
                .max_by_key(|v| v.bandwidth)
                .map(|v| v.url.as_str()),
            Manifest::Media(_) => None,
        }
    }
}

pub fn parse(text: &str, base_url: &str) -> Manifest {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    if lines.iter().any(|l| l.starts_with("#EXT-X-STREAM-INF")) {
        return Manifest::Master(parse_master(&lines, base_url));
    }
    Manifest::Media(parse_media(&lines, base_url))
}

fn parse_master(lines: &[&str], base_url: &str) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("#EXT-X-STREAM-INF") {
            let bandwidth = extract_attr_u64(line, "BANDWIDTH").unwrap_or(0);

            // The variant URI is the next non-tag line.
            let mut j = i + 1;
            while j < lines.len() && lines[j].starts_with('#') {
                j += 1;
            }
            if j < lines.len() && !lines[j].is_empty() {
                variants.push(Variant {
                    url: resolve_url(base_url, lines[j]),
                    bandwidth,
                });
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }

    tracing::debug!("manifest: found {} variants", variants.len());
    variants
}

fn parse_media(lines: &[&str], base_url: &str) -> MediaPlaylist {
    let mut segments = Vec::new();
    let mut init = None;
    let mut sequence = 0u64;
    let mut next_offset = 0u64;
    let mut pending_range: Option<ByteRange> = None;
    let mut pending_duration = 0f64;
    let mut ended = false;

    for line in lines {
        if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            sequence = rest.trim().parse().unwrap_or(0);
        } else if line.starts_with("#EXT-X-MAP") {
            if let Some(url) = extract_attr_str(line, "URI").map(|u| resolve_url(base_url, &u)) {
                let range =
                    extract_attr_str(line, "BYTERANGE").and_then(|r| parse_byte_range(&r, 0));
                init = Some(Segment {
                    url,
                    sequence: 0,
                    duration_secs: 0.0,
                    range,
                });
            }
        } else if let Some(rest) = line.strip_prefix("#EXT-X-BYTERANGE:") {
            match parse_byte_range(rest, next_offset) {
                Some(range) => {
                    next_offset = range.offset + range.length;
                    pending_range = Some(range);
                }
                None => {
                    // An empty or unparsable range cannot be fetched; deliver
                    // the segment whole instead.
                    tracing::debug!("manifest: dropping byte range {:?}", rest);
                    pending_range = None;
                }
            }
        } else if let Some(rest) = line.strip_prefix("#EXTINF:") {
            pending_duration = rest
                .split(',')
                .next()
                .and_then(|d| d.trim().parse().ok())
                .unwrap_or(0.0);
        } else if line.starts_with("#EXT-X-ENDLIST") {
            ended = true;
        } else if !line.starts_with('#') && !line.is_empty() {
            segments.push(Segment {
                url: resolve_url(base_url, line),
                sequence,
                duration_secs: pending_duration,
                range: pending_range.take(),
            });
            sequence += 1;
            pending_duration = 0.0;
        }
    }

    MediaPlaylist {
        init,
        segments,
        ended,
    }
}

/// Parses `"length[@offset]"`. `None` for anything without a positive length.
fn parse_byte_range(attr: &str, last_end_offset: u64) -> Option<ByteRange> {
    let attr = attr.trim().trim_matches('"');
    let mut parts = attr.split('@');
    let length = parts
        .next()
        .and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|l| *l > 0)?;
    let offset = parts
        .next()
        .and_then(|p| p.trim().parse::<u64>().ok())
        .unwrap_or(last_end_offset);
    Some(ByteRange { length, offset })
}

fn extract_attr_u64(line: &str, key: &str) -> Option<u64> {
    extract_attr_str(line, key)?.parse().ok()
}

fn extract_attr_str(line: &str, key: &str) -> Option<String> {
    let key_eq = format!("{}=", key);
    // Attributes follow #TAG: or a comma
    let pos = line
        .find(&format!(":{}", key_eq))
        .map(|p| p + 1)
        .or_else(|| line.find(&format!(",{}", key_eq)).map(|p| p + 1))?;

    let rest = &line[pos + key_eq.len()..];

    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest.find(',').unwrap_or(rest.len());
        Some(rest[..end].trim().to_string())
    }
}

/// Resolve a (possibly relative) segment/variant URL against the manifest URL.
fn resolve_url(base: &str, maybe_relative: &str) -> String {
    if maybe_relative.starts_with("http://") || maybe_relative.starts_with("https://") {
        return maybe_relative.to_string();
    }

    // Absolute path: replace everything after the host.
    if maybe_relative.starts_with('/') {
        if let Some(scheme_end) = base.find("://") {
            let host_start = scheme_end + 3;
            let host_end = base[host_start..]
                .find('/')
                .map(|p| host_start + p)
                .unwrap_or(base.len());
            return format!("{}{}", &base[..host_end], maybe_relative);
        }
    }

    // Relative path: strip the last path component from the base and append.
    let base_dir = base.rfind('/').map(|i| &base[..=i]).unwrap_or(base);
    format!("{}{}", base_dir, maybe_relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_playlist_sequences_and_durations() {
        let text = "#EXTM3U\n\
                    #EXT-X-MEDIA-SEQUENCE:7\n\
                    #EXTINF:2.0,\n\
                    seg7.webm\n\
                    #EXTINF:2.5,\n\
                    seg8.webm\n";
        let Manifest::Media(playlist) = parse(text, "https://live.example.com/audio/index.m3u8")
        else {
            panic!("expected media playlist");
        };
        assert_eq!(playlist.segments.len(), 2);
        assert_eq!(playlist.segments[0].sequence, 7);
        assert_eq!(playlist.segments[1].sequence, 8);
        assert_eq!(playlist.segments[1].duration_secs, 2.5);
        assert_eq!(
            playlist.segments[0].url,
            "https://live.example.com/audio/seg7.webm"
        );
        assert!(!playlist.ended);
    }

    #[test]
    fn media_playlist_map_and_byterange() {
        let text = "#EXTM3U\n\
                    #EXT-X-MAP:URI=\"init.mp4\",BYTERANGE=\"600@0\"\n\
                    #EXTINF:4.0,\n\
                    #EXT-X-BYTERANGE:1000@600\n\
                    media.mp4\n\
                    #EXT-X-ENDLIST\n";
        let Manifest::Media(playlist) = parse(text, "https://live.example.com/a/p.m3u8") else {
            panic!("expected media playlist");
        };
        let init = playlist.init.expect("init segment");
        assert_eq!(init.url, "https://live.example.com/a/init.mp4");
        assert_eq!(
            init.range,
            Some(ByteRange {
                length: 600,
                offset: 0
            })
        );
        assert_eq!(
            playlist.segments[0].range,
            Some(ByteRange {
                length: 1000,
                offset: 600
            })
        );
        assert!(playlist.ended);
    }

    #[test]
    fn continued_byteranges_inherit_offsets() {
        let text = "#EXTINF:1.0,\n\
                    #EXT-X-BYTERANGE:100@0\n\
                    all.ts\n\
                    #EXTINF:1.0,\n\
                    #EXT-X-BYTERANGE:250\n\
                    all.ts\n";
        let Manifest::Media(playlist) = parse(text, "https://x/p.m3u8") else {
            panic!("expected media playlist");
        };
        assert_eq!(
            playlist.segments[1].range,
            Some(ByteRange {
                length: 250,
                offset: 100
            })
        );
    }

    #[test]
    fn empty_or_unparsable_byte_ranges_are_dropped() {
        let text = "#EXTINF:1.0,\n\
                    #EXT-X-BYTERANGE:garbage\n\
                    a.ts\n\
                    #EXTINF:1.0,\n\
                    #EXT-X-BYTERANGE:0@10\n\
                    b.ts\n\
                    #EXTINF:1.0,\n\
                    #EXT-X-BYTERANGE:50@10\n\
                    c.ts\n";
        let Manifest::Media(playlist) = parse(text, "https://x/p.m3u8") else {
            panic!("expected media playlist");
        };
        assert_eq!(playlist.segments[0].range, None);
        assert_eq!(playlist.segments[1].range, None);
        assert_eq!(
            playlist.segments[2].range,
            Some(ByteRange {
                length: 50,
                offset: 10
            })
        );
    }

    #[test]
    fn master_playlist_picks_highest_bandwidth() {
        let text = "#EXTM3U\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=128000,CODECS=\"opus\"\n\
                    low/index.m3u8\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=256000,CODECS=\"opus\"\n\
                    high/index.m3u8\n";
        let manifest = parse(text, "https://live.example.com/master.m3u8");
        assert_eq!(
            manifest.best_variant(),
            Some("https://live.example.com/high/index.m3u8")
        );
    }

    #[test]
    fn resolves_absolute_and_relative_urls() {
        assert_eq!(
            resolve_url("https://h.example.com/a/b.m3u8", "/root/seg.ts"),
            "https://h.example.com/root/seg.ts"
        );
        assert_eq!(
            resolve_url("https://h.example.com/a/b.m3u8", "seg.ts"),
            "https://h.example.com/a/seg.ts"
        );
        assert_eq!(
            resolve_url("https://h.example.com/a/b.m3u8", "https://o.example.com/s.ts"),
            "https://o.example.com/s.ts"
        );
    }
}
