//! URL classification.
//!
//! Input is parsed once with the WHATWG URL parser and every pattern, both
//! the host table used by [`classify`] and the stricter per-platform post
//! shapes used by [`validate`], is matched against that normalized form.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
    Facebook,
    Twitter,
    Reddit,
    SoundCloud,
    Dailymotion,
    Twitch,
    Telegram,
    Unknown,
    InvalidUrl
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Instagram => "Instagram",
            Self::TikTok => "TikTok",
            Self::Facebook => "Facebook",
            Self::Twitter => "Twitter",
            Self::Reddit => "Reddit",
            Self::SoundCloud => "SoundCloud",
            Self::Dailymotion => "Dailymotion",
            Self::Twitch => "Twitch",
            Self::Telegram => "Telegram",
            Self::Unknown => "Unknown",
            Self::InvalidUrl => "Invalid URL"
        }
    }

    /// Whether a download operation exists for this tag.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown | Self::InvalidUrl)
    }

    /// Whether downloads go through the scrapers instead of yt-dlp.
    pub fn is_scraped(self) -> bool {
        matches!(self, Self::Instagram | Self::TikTok)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(table: &[(Platform, &str)]) -> Vec<(Platform, Regex)> {
    table
        .iter()
        .map(|(platform, pattern)| (*platform, Regex::new(pattern).expect("static URL pattern")))
        .collect()
}

/// Host table, in priority order.
static HOST_PATTERNS: LazyLock<Vec<(Platform, Regex)>> = LazyLock::new(|| {
    compile(&[
        (Platform::YouTube, r"^https?://(?:(?:www|m|music)\.)?(?:youtube\.com|youtu\.be)/.+$"),
        (Platform::Instagram, r"^https?://(?:www\.)?instagram\.com/.+$"),
        (Platform::TikTok, r"^https?://(?:[a-z0-9-]+\.)?tiktok\.com/.+$"),
        (Platform::Facebook, r"^https?://(?:(?:www|m|web)\.)?(?:facebook\.com|fb\.watch)/.+$"),
        (Platform::Twitter, r"^https?://(?:(?:www|mobile)\.)?(?:twitter\.com|x\.com)/.+$"),
        (Platform::Reddit, r"^https?://(?:(?:www|old|new)\.)?reddit\.com/.+$"),
        (Platform::SoundCloud, r"^https?://(?:(?:www|m)\.)?soundcloud\.com/.+$"),
        (Platform::Dailymotion, r"^https?://(?:(?:www\.)?dailymotion\.com|dai\.ly)/.+$"),
        (Platform::Twitch, r"^https?://(?:(?:www|m|clips)\.)?twitch\.tv/.+$"),
        (Platform::Telegram, r"^https?://(?:t\.me|telegram\.me)/.+$")
    ])
});

/// Post shapes a download operation accepts.
static POST_PATTERNS: LazyLock<Vec<(Platform, Regex)>> = LazyLock::new(|| {
    compile(&[
        (
            Platform::YouTube,
            r"^https://(?:(?:www|m|music)\.)?youtube\.com/(?:watch\?v=|playlist\?list=|shorts/)|^https://youtu\.be/."
        ),
        (Platform::Instagram, r"^https://(?:www\.)?instagram\.com/.+"),
        (Platform::TikTok, r"^https://(?:[a-z0-9-]+\.)?tiktok\.com/[^?]+"),
        (
            Platform::Facebook,
            r"^https://(?:(?:www|m|web)\.)?facebook\.com/(?:.*/videos/|watch/?\?v=|reel/)|^https://fb\.watch/."
        ),
        (
            Platform::Twitter,
            r"^https://(?:(?:www|mobile)\.)?(?:twitter\.com|x\.com)/[^/]+/status/[^/?]+"
        ),
        (Platform::Reddit, r"^https://(?:(?:www|old|new)\.)?reddit\.com/.+/.+"),
        (Platform::SoundCloud, r"^https://(?:(?:www|m)\.)?soundcloud\.com/.+"),
        (
            Platform::Dailymotion,
            r"^https://(?:www\.)?dailymotion\.com/video/.|^https://dai\.ly/."
        ),
        (Platform::Twitch, r"^https://(?:(?:www|m|clips)\.)?twitch\.tv/.+"),
        (Platform::Telegram, r"^https://(?:t\.me|telegram\.me)/[^/]+/\d+")
    ])
});

/// Parses `input` as an absolute http(s) URL with a host.
pub fn normalize(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    (web && has_host).then_some(url)
}

/// Tags `input` with the first platform whose host pattern matches.
///
/// Pure: no I/O, never panics.
pub fn classify(input: &str) -> Platform {
    let Some(url) = normalize(input) else {
        return Platform::InvalidUrl;
    };
    HOST_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(url.as_str()))
        .map_or(Platform::Unknown, |(platform, _)| *platform)
}

/// Checks `input` against the post shape `platform` downloads accept and
/// returns the normalized URL to hand to the downloader.
pub fn validate(platform: Platform, input: &str) -> Result<Url> {
    let invalid = || Error::InvalidUrl {
        platform,
        url: input.to_string()
    };
    let url = normalize(input).ok_or_else(invalid)?;
    let accepted = POST_PATTERNS
        .iter()
        .any(|(candidate, pattern)| *candidate == platform && pattern.is_match(url.as_str()));
    if accepted { Ok(url) } else { Err(invalid()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_inputs() {
        for input in ["not a url", "", "   ", "mailto:someone@example.com", "ftp://youtube.com/x", "youtube.com/watch?v=x", "http://"] {
            assert_eq!(classify(input), Platform::InvalidUrl, "{input}");
        }
    }

    #[test]
    fn test_unknown_hosts() {
        for input in [
            "https://example.com/video",
            "https://www.youtube.com",
            "https://notx.com/user/status/1",
            "https://youtube.com.evil.net/watch?v=x",
            "https://vimeo.com/12345"
        ] {
            assert_eq!(classify(input), Platform::Unknown, "{input}");
        }
    }

    #[test]
    fn test_known_hosts() {
        let cases = [
            ("https://www.youtube.com/shorts/H_IwLWa64gs", Platform::YouTube),
            ("https://youtu.be/dQw4w9WgXcQ", Platform::YouTube),
            ("http://m.youtube.com/watch?v=dQw4w9WgXcQ", Platform::YouTube),
            ("https://www.instagram.com/p/C1a2b3c4d5e/", Platform::Instagram),
            ("https://www.tiktok.com/@user/video/7234567890123456789", Platform::TikTok),
            ("https://vm.tiktok.com/ZMabcdef/", Platform::TikTok),
            ("https://www.facebook.com/page/videos/123456/", Platform::Facebook),
            ("https://fb.watch/abcDEF/", Platform::Facebook),
            ("https://twitter.com/user/status/1234567890", Platform::Twitter),
            ("https://x.com/user/status/1234567890", Platform::Twitter),
            ("https://www.reddit.com/r/videos/comments/abc123/title/", Platform::Reddit),
            ("https://soundcloud.com/artist/track", Platform::SoundCloud),
            ("https://www.dailymotion.com/video/x8abcd", Platform::Dailymotion),
            ("https://dai.ly/x8abcd", Platform::Dailymotion),
            ("https://www.twitch.tv/videos/123456789", Platform::Twitch),
            ("https://clips.twitch.tv/SomeClip", Platform::Twitch),
            ("https://t.me/durov/123", Platform::Telegram)
        ];
        for (input, expected) in cases {
            assert_eq!(classify(input), expected, "{input}");
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let url = "https://www.youtube.com/shorts/H_IwLWa64gs";
        let first = classify(url);
        for _ in 0..10 {
            assert_eq!(classify(url), first);
        }
    }

    #[test]
    fn test_host_is_case_insensitive_after_normalization() {
        assert_eq!(classify("HTTPS://WWW.YOUTUBE.COM/watch?v=abc"), Platform::YouTube);
    }

    #[test]
    fn test_validate_accepts_post_shapes() {
        assert!(validate(Platform::YouTube, "https://www.youtube.com/shorts/H_IwLWa64gs").is_ok());
        assert!(validate(Platform::YouTube, "https://www.youtube.com/playlist?list=PL123").is_ok());
        assert!(validate(Platform::Twitter, "https://x.com/someone/status/1790000000000000000").is_ok());
        assert!(validate(Platform::Facebook, "https://www.facebook.com/someone/videos/987654321/").is_ok());
        assert!(validate(Platform::Dailymotion, "https://www.dailymotion.com/video/x8abcd").is_ok());
        assert!(validate(Platform::Telegram, "https://t.me/durov/123").is_ok());
    }

    #[test]
    fn test_validate_rejects_other_shapes() {
        let rejected = [
            (Platform::YouTube, "https://www.youtube.com/@channel"),
            (Platform::YouTube, "https://vimeo.com/123"),
            (Platform::Twitter, "https://x.com/someone"),
            (Platform::Facebook, "https://www.facebook.com/someone"),
            (Platform::Dailymotion, "https://www.dailymotion.com/someone"),
            (Platform::Telegram, "https://t.me/durov"),
            (Platform::SoundCloud, "not a url")
        ];
        for (platform, input) in rejected {
            let err = validate(platform, input).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl { .. }), "{input}");
        }
    }

    #[test]
    fn test_validate_returns_normalized_url() {
        let url = validate(Platform::YouTube, "https://WWW.YouTube.com/watch?v=abc").unwrap();
        assert_eq!(url.as_str(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_support_flags() {
        assert!(Platform::YouTube.is_supported());
        assert!(!Platform::Unknown.is_supported());
        assert!(Platform::TikTok.is_scraped());
        assert!(!Platform::Twitch.is_scraped());
        assert_eq!(Platform::InvalidUrl.to_string(), "Invalid URL");
    }
}
