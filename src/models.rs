use std::path::PathBuf;

use reqwest::Url;
use serde::Deserialize;

use crate::classifier::{extract_url, is_tiktok_url};
use crate::config::MAX_TITLE_LEN;

const DEFAULT_TITLE: &str = "tiktok_video";
const DEFAULT_EXT: &str = "mp4";

/// A chat message that carries a supported video link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub text: String,
    pub url: String,
}

impl VideoRequest {
    /// Build a request from a raw message, or `None` if it holds no TikTok link.
    pub fn from_text(text: &str) -> Option<Self> {
        let url = extract_url(text)?;
        if !is_tiktok_url(url) {
            return None;
        }
        // Scheme and host come back lowercased
        let url = Url::parse(url).ok()?;

        Some(Self {
            text: text.to_string(),
            url: url.to_string(),
        })
    }
}

/// The subset of the extractor's JSON info we care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub ext: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub duration_secs: u64,
    pub ext: String,
}

impl VideoMetadata {
    pub fn from_probe(info: ProbeInfo) -> Self {
        let title = info
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let duration_secs = match info.duration {
            Some(secs) if secs.is_finite() && secs > 0.0 => secs.ceil() as u64,
            _ => 0,
        };

        let ext = info
            .ext
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| DEFAULT_EXT.to_string());

        Self {
            title: truncate_chars(&title, MAX_TITLE_LEN),
            duration_secs,
            ext,
        }
    }
}

/// A media file sitting in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    pub path: PathBuf,
    pub size: u64,
}

/// What a successful run hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub title: String,
    pub size: u64,
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_from_whole_url() {
        let req = VideoRequest::from_text("https://www.tiktok.com/@a/video/1").unwrap();
        assert_eq!(req.url, "https://www.tiktok.com/@a/video/1");
    }

    #[test]
    fn request_from_embedded_url() {
        let req = VideoRequest::from_text("check https://vm.tiktok.com/ZM1/ please").unwrap();
        assert_eq!(req.url, "https://vm.tiktok.com/ZM1/");
        assert_eq!(req.text, "check https://vm.tiktok.com/ZM1/ please");
    }

    #[test]
    fn request_from_capitalised_scheme() {
        for text in [
            "Https://vm.tiktok.com/ZMabc/",
            "HTTPS://www.tiktok.com/@a/video/1",
            "Look: hTTp://m.tiktok.com/v/123.html",
        ] {
            let req = VideoRequest::from_text(text);
            assert!(req.is_some(), "{text:?} should be accepted");
        }

        let req = VideoRequest::from_text("HTTPS://VM.TikTok.com/ZMabc/").unwrap();
        assert_eq!(req.url, "https://vm.tiktok.com/ZMabc/");
    }

    #[test]
    fn no_request_for_other_sites() {
        assert_eq!(VideoRequest::from_text("https://example.com/video"), None);
        assert_eq!(VideoRequest::from_text("hi"), None);
        assert_eq!(VideoRequest::from_text(""), None);
    }

    #[test]
    fn metadata_defaults() {
        let meta = VideoMetadata::from_probe(ProbeInfo::default());
        assert_eq!(meta.title, "tiktok_video");
        assert_eq!(meta.duration_secs, 0);
        assert_eq!(meta.ext, "mp4");
    }

    #[test]
    fn metadata_rounds_duration_up_and_clamps_negative() {
        let meta = VideoMetadata::from_probe(ProbeInfo {
            duration: Some(179.2),
            ..Default::default()
        });
        assert_eq!(meta.duration_secs, 180);

        let meta = VideoMetadata::from_probe(ProbeInfo {
            duration: Some(180.4),
            ..Default::default()
        });
        assert_eq!(meta.duration_secs, 181);

        let meta = VideoMetadata::from_probe(ProbeInfo {
            duration: Some(-3.0),
            ..Default::default()
        });
        assert_eq!(meta.duration_secs, 0);
    }

    #[test]
    fn metadata_truncates_long_titles_on_char_boundary() {
        let title = "é".repeat(150);
        let meta = VideoMetadata::from_probe(ProbeInfo {
            title: Some(title),
            ..Default::default()
        });
        assert_eq!(meta.title.chars().count(), 100);
    }

    #[test]
    fn metadata_rejects_suspicious_extension() {
        let meta = VideoMetadata::from_probe(ProbeInfo {
            ext: Some("../mp4".to_string()),
            ..Default::default()
        });
        assert_eq!(meta.ext, "mp4");
    }
}
