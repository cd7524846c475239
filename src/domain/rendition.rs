//! Target resolutions and the per-rendition results built from them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }
}

/// The fixed ladder, in manifest order.
pub fn default_ladder() -> Vec<Resolution> {
    vec![
        Resolution::new("360p", 640, 360),
        Resolution::new("480p", 854, 480),
        Resolution::new("720p", 1280, 720),
        Resolution::new("1080p", 1920, 1080),
    ]
}

/// Coarse bandwidth estimate from the frame area, not a measured bitrate.
pub fn approximate_bandwidth(width: u32, height: u32) -> u64 {
    (width as f64 * height as f64 * 1.5).round() as u64
}

pub const FALLBACK_CODEC_TAG: &str = "avc1.42e01e,mp4a.40.2";

/// Codec string advertised for a rendition, looked up by name.
pub fn codec_tag(resolution_name: &str) -> &'static str {
    match resolution_name {
        "360p" => "avc1.42e01e,mp4a.40.2",
        "480p" => "avc1.4d401e,mp4a.40.2",
        "720p" => "avc1.4d401f,mp4a.40.2",
        "1080p" => "avc1.640028,mp4a.40.2",
        _ => FALLBACK_CODEC_TAG,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionResult {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Playlist path relative to the master manifest.
    pub playlist_location: String,
    pub bandwidth: u64,
    pub codec_tag: String,
}

impl RenditionResult {
    pub fn for_resolution(resolution: &Resolution) -> Self {
        Self {
            name: resolution.name.clone(),
            width: resolution.width,
            height: resolution.height,
            playlist_location: format!("{}/playlist.m3u8", resolution.name),
            bandwidth: approximate_bandwidth(resolution.width, resolution.height),
            codec_tag: codec_tag(&resolution.name).to_string(),
        }
    }
}

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// Turns a file stem into a storage-safe name: punctuation and whitespace
/// become `_`, runs collapse, edges are trimmed.
pub fn sanitize_file_name(name: &str) -> String {
    let name = NON_WORD.replace_all(name, "_");
    let name = WHITESPACE.replace_all(&name, "_");
    let name = UNDERSCORES.replace_all(&name, "_");
    name.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandwidth_heuristic() {
        assert_eq!(approximate_bandwidth(640, 360), 345_600);
        assert_eq!(approximate_bandwidth(854, 480), 614_880);
        assert_eq!(approximate_bandwidth(1920, 1080), 3_110_400);
        assert_eq!(approximate_bandwidth(3, 1), 5);
    }

    #[test]
    fn test_codec_tag_fallback() {
        assert_eq!(codec_tag("1080p"), "avc1.640028,mp4a.40.2");
        assert_eq!(codec_tag("144p"), FALLBACK_CODEC_TAG);
    }

    #[test]
    fn test_rendition_for_resolution() {
        let r = RenditionResult::for_resolution(&Resolution::new("720p", 1280, 720));
        assert_eq!(r.playlist_location, "720p/playlist.m3u8");
        assert_eq!(r.bandwidth, 1_382_400);
        assert_eq!(r.codec_tag, "avc1.4d401f,mp4a.40.2");
    }

    #[test]
    fn test_default_ladder_order() {
        let names: Vec<String> = default_ladder().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["360p", "480p", "720p", "1080p"]);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Holiday (2024)!"), "My_Holiday_2024");
        assert_eq!(sanitize_file_name("  a -- b  "), "a_b");
        assert_eq!(sanitize_file_name("clip_01"), "clip_01");
    }
}
