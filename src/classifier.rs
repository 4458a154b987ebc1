use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

/// Hosts TikTok serves videos and short links from.
const TIKTOK_HOSTS: &[&str] = &[
    "tiktok.com",
    "www.tiktok.com",
    "m.tiktok.com",
    "vm.tiktok.com",
    "vt.tiktok.com",
];

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://[^\s]+").expect("static url regex"));

/// Check if the text is a TikTok video URL.
///
/// Anything that does not parse as an absolute http(s) URL is simply not supported.
pub fn is_tiktok_url(text: &str) -> bool {
    let url = match Url::parse(text.trim()) {
        Ok(url) => url,
        Err(_) => return false,
    };

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host_str() {
        Some(host) => {
            let host = host.trim_end_matches('.').to_lowercase();
            TIKTOK_HOSTS.contains(&host.as_str()) || host.ends_with(".tiktok.com")
        }
        None => false,
    }
}

/// Find the first http(s) link in a message, without the punctuation people wrap it in.
pub fn extract_url(text: &str) -> Option<&str> {
    URL_REGEX
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| matches!(c, ',' | ';' | '.' | ')' | ']' | '>' | '"' | '\'' | '!' | '?'))
        })
        .find(|url| !url.is_empty())
}
