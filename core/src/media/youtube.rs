use once_cell::sync::Lazy;
use regex::Regex;

/// Matches every YouTube URL shape an operator is likely to paste and
/// captures the 11 character video id.
static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?i:youtube(?:-nocookie)?\.com)/(?:[^/\s]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|(?i:youtu\.be)/)([A-Za-z0-9_-]{11})",
    )
    .expect("youtube id pattern is valid")
});

const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Check if a string mentions a YouTube host
pub fn is_youtube_url(lower: &str) -> bool {
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

/// Helper function to extract YouTube video ID from URL
pub fn extract_youtube_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Build the canonical embed URL for a video id.
///
/// `origin` is the page origin the embed is served from and ends up
/// percent-encoded in the query. Looping a single video requires the
/// `playlist` parameter to repeat the video id.
pub fn embed_url(id: &str, origin: &str, loop_enabled: bool) -> String {
    let mut url = format!(
        "{EMBED_BASE}{id}?autoplay=1&rel=0&enablejsapi=1&origin={}",
        urlencoding::encode(origin)
    );
    if loop_enabled {
        url.push_str("&loop=1&playlist=");
        url.push_str(id);
    }
    url
}
