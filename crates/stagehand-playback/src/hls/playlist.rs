//! M3U8 playlist parsing.
//!
//! Covers the subset of RFC 8216 (plus the low-latency extensions) that a
//! MediaMTX HLS muxer produces. Unknown tags are skipped.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("not an M3U8 playlist (missing #EXTM3U)")]
    MissingHeader,

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("playlist has neither variants nor a target duration")]
    Unrecognized,
}

/// One `#EXT-X-STREAM-INF` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub uri: String,
    pub bandwidth: Option<u64>,
    pub codecs: Option<String>,
    pub resolution: Option<String>,
}

impl Variant {
    pub fn has_video(&self) -> bool {
        self.resolution.is_some()
            || self.codecs.as_deref().is_some_and(|codecs| {
                codecs.split(',').any(|codec| {
                    let codec = codec.trim();
                    ["avc1", "avc3", "hvc1", "hev1", "vp09", "av01"]
                        .iter()
                        .any(|prefix| codec.starts_with(prefix))
                })
            })
    }
}

/// One `#EXT-X-MEDIA` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    /// `AUDIO`, `VIDEO`, `SUBTITLES` or `CLOSED-CAPTIONS`.
    pub media_type: String,
    pub group_id: String,
    pub name: String,
    pub uri: Option<String>,
    pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultivariantPlaylist {
    pub variants: Vec<Variant>,
    pub renditions: Vec<Rendition>,
}

impl MultivariantPlaylist {
    /// Playlist a player should follow.
    ///
    /// Audio-only playback prefers a separate audio rendition so no video
    /// segments are fetched at all.
    pub fn media_playlist_uri(&self, include_video: bool) -> Option<&str> {
        if !include_video {
            let audio = self
                .renditions
                .iter()
                .filter(|r| r.media_type == "AUDIO" && r.uri.is_some())
                .max_by_key(|r| r.default);
            if let Some(uri) = audio.and_then(|r| r.uri.as_deref()) {
                return Some(uri);
            }
        }
        self.variants.first().map(|v| v.uri.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub uri: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub target_duration: f64,
    pub media_sequence: u64,
    /// `PART-TARGET` from `#EXT-X-PART-INF`, present for low-latency streams.
    pub part_target: Option<f64>,
    pub segments: Vec<Segment>,
    /// `#EXT-X-ENDLIST` seen; the stream will not grow.
    pub ended: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Multivariant(MultivariantPlaylist),
    Media(MediaPlaylist),
}

pub fn parse_playlist(text: &str) -> Result<Playlist, PlaylistError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, "#EXTM3U")) => {}
        _ => return Err(PlaylistError::MissingHeader),
    }

    let mut multivariant = MultivariantPlaylist::default();
    let mut pending_variant: Option<Variant> = None;

    let mut target_duration = None;
    let mut media_sequence = 0;
    let mut part_target = None;
    let mut segments = Vec::new();
    let mut pending_duration: Option<f64> = None;
    let mut ended = false;

    for (number, line) in lines {
        let malformed = |reason: &str| PlaylistError::Malformed {
            line: number,
            reason: reason.to_string(),
        };

        if let Some(rest) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            let attrs = parse_attributes(rest);
            pending_variant = Some(Variant {
                uri: String::new(),
                bandwidth: attribute(&attrs, "BANDWIDTH").and_then(|v| v.parse().ok()),
                codecs: attribute(&attrs, "CODECS").map(str::to_string),
                resolution: attribute(&attrs, "RESOLUTION").map(str::to_string),
            });
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA:") {
            let attrs = parse_attributes(rest);
            multivariant.renditions.push(Rendition {
                media_type: attribute(&attrs, "TYPE")
                    .ok_or_else(|| malformed("EXT-X-MEDIA without TYPE"))?
                    .to_string(),
                group_id: attribute(&attrs, "GROUP-ID").unwrap_or_default().to_string(),
                name: attribute(&attrs, "NAME").unwrap_or_default().to_string(),
                uri: attribute(&attrs, "URI").map(str::to_string),
                default: attribute(&attrs, "DEFAULT") == Some("YES"),
            });
        } else if let Some(rest) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = Some(
                rest.parse::<f64>()
                    .map_err(|_| malformed("invalid target duration"))?,
            );
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            media_sequence = rest
                .parse()
                .map_err(|_| malformed("invalid media sequence"))?;
        } else if let Some(rest) = line.strip_prefix("#EXT-X-PART-INF:") {
            let attrs = parse_attributes(rest);
            part_target = attribute(&attrs, "PART-TARGET").and_then(|v| v.parse().ok());
        } else if let Some(rest) = line.strip_prefix("#EXTINF:") {
            let duration = rest.split(',').next().unwrap_or_default();
            pending_duration = Some(
                duration
                    .parse()
                    .map_err(|_| malformed("invalid segment duration"))?,
            );
        } else if line == "#EXT-X-ENDLIST" {
            ended = true;
        } else if line.starts_with('#') {
            // Other tags and comments
        } else if let Some(mut variant) = pending_variant.take() {
            variant.uri = line.to_string();
            multivariant.variants.push(variant);
        } else if let Some(duration) = pending_duration.take() {
            segments.push(Segment {
                uri: line.to_string(),
                duration,
            });
        } else {
            return Err(malformed("URI without a preceding tag"));
        }
    }

    if !multivariant.variants.is_empty() {
        return Ok(Playlist::Multivariant(multivariant));
    }

    match target_duration {
        Some(target_duration) => Ok(Playlist::Media(MediaPlaylist {
            target_duration,
            media_sequence,
            part_target,
            segments,
            ended,
        })),
        None => Err(PlaylistError::Unrecognized),
    }
}

/// Split an attribute list, honoring quoted values that contain commas.
fn parse_attributes(list: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = list;

    while !rest.is_empty() {
        let Some((key, after_key)) = rest.split_once('=') else {
            break;
        };
        let (value, remaining) = if let Some(quoted) = after_key.strip_prefix('"') {
            match quoted.split_once('"') {
                Some((value, remaining)) => (value, remaining),
                None => (quoted, ""),
            }
        } else {
            after_key.split_once(',').map_or((after_key, ""), |(value, remaining)| {
                (value, remaining)
            })
        };

        attrs.push((key.trim().to_string(), value.to_string()));
        rest = remaining.trim_start_matches(',');
    }

    attrs
}

fn attribute<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
