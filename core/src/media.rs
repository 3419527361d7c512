mod direct;
mod youtube;

use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use direct::{VIDEO_EXTENSIONS, has_video_extension, is_cloudinary_url};
pub use youtube::{embed_url, extract_youtube_id, is_youtube_url};

static EMBED_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)src=["']([^"']+)["']"#).expect("embed src pattern is valid"));

const IFRAME_TAG: &str = "<iframe";

/// Where a pasted link is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    /// YouTube watch, share or embed link
    YouTube,
    /// Cloudinary media CDN
    Cloudinary,
    /// Any other direct media file, or a non-YouTube iframe
    Direct,
    /// Nothing we know how to play
    Unknown,
}

impl VideoProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoProvider::YouTube => "youtube",
            VideoProvider::Cloudinary => "cloudinary",
            VideoProvider::Direct => "direct",
            VideoProvider::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VideoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a resolved source has to be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Third-party frame player (YouTube)
    EmbeddedFrame,
    /// Built-in video element fed the media URL directly
    NativeVideo,
}

/// A normalized source ready to hand to a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableSource {
    pub kind: RenderKind,
    pub provider: VideoProvider,
    /// Final absolute URL
    pub url: String,
    /// Whether the renderer should loop the media
    pub looping: bool,
}

/// Classify raw operator input.
///
/// Precedence matters: an iframe mentioning YouTube wins over everything,
/// then YouTube hosts, then Cloudinary, then other iframes and bare media
/// files. Empty and whitespace-only input is `Unknown`.
pub fn classify(raw: &str) -> VideoProvider {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return VideoProvider::Unknown;
    }

    let iframe = lower.contains(IFRAME_TAG);
    if iframe && lower.contains("youtube") {
        VideoProvider::YouTube
    } else if is_youtube_url(&lower) {
        VideoProvider::YouTube
    } else if is_cloudinary_url(&lower) {
        VideoProvider::Cloudinary
    } else if iframe || has_video_extension(&lower) {
        VideoProvider::Direct
    } else {
        VideoProvider::Unknown
    }
}

/// Whether the settings and admin forms should accept the input.
///
/// Computed from [`classify`] so the forms never accept something the
/// resolver would refuse to classify.
pub fn is_valid_video_link(raw: &str) -> bool {
    classify(raw) != VideoProvider::Unknown
}

/// Pull the first `src` attribute out of an iframe snippet
pub fn extract_embed_src(raw: &str) -> Option<&str> {
    EMBED_SRC
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|src| !src.is_empty())
}

/// Turns raw operator input into a [`PlayableSource`].
#[derive(Debug, Clone)]
pub struct Resolver {
    origin: String,
}

impl Resolver {
    /// `origin` is passed to YouTube embeds so domain-restricted videos load
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Resolve a link into a playable source, or `None` when it cannot be
    /// played. Never guesses: unknown input and embeds without a usable
    /// `src` fail closed.
    pub fn resolve(&self, raw: &str, loop_enabled: bool) -> Option<PlayableSource> {
        let provider = classify(raw);
        if provider == VideoProvider::Unknown {
            debug!("Rejecting unclassifiable link: {:?}", raw);
            return None;
        }

        let trimmed = raw.trim();
        let working = if trimmed.to_lowercase().contains(IFRAME_TAG) {
            match extract_embed_src(trimmed) {
                Some(src) => src,
                None => {
                    debug!("Embed code has no src attribute");
                    return None;
                }
            }
        } else {
            trimmed
        };

        let source = match provider {
            VideoProvider::YouTube => {
                let Some(id) = extract_youtube_id(working) else {
                    debug!("No YouTube video id in {:?}", working);
                    return None;
                };
                PlayableSource {
                    kind: RenderKind::EmbeddedFrame,
                    provider,
                    url: embed_url(id, &self.origin, loop_enabled),
                    looping: loop_enabled,
                }
            }
            VideoProvider::Cloudinary | VideoProvider::Direct => PlayableSource {
                kind: RenderKind::NativeVideo,
                provider,
                url: working.to_string(),
                looping: loop_enabled,
            },
            VideoProvider::Unknown => return None,
        };

        debug!("Resolved {} source: {}", source.provider, source.url);
        Some(source)
    }
}
