/// Extensions the native video element can play without an embed player
pub const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".webm", ".ogg", ".mov"];

const CLOUDINARY_HOST: &str = "res.cloudinary.com";

/// Check if a lowercased link points at Cloudinary's media CDN
pub fn is_cloudinary_url(lower: &str) -> bool {
    lower.contains(CLOUDINARY_HOST)
}

/// Check if a lowercased link ends in a known video file extension
pub fn has_video_extension(lower: &str) -> bool {
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
