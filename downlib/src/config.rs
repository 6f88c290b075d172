use std::path::PathBuf;
use std::time::Duration;

use crate::provision::Provisioner;

pub const INSTAGRAM_ENDPOINT: &str = "https://v3.saveig.app/api/ajaxSearch";
pub const TIKTOK_FEED_ENDPOINT: &str = "https://api22-normal-c-alisg.tiktokv.com/aweme/v1/feed/";
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Exponential backoff for scraper calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(2)
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ytdlp_path: PathBuf,
    /// Arguments placed before every generated yt-dlp argument list.
    pub ytdlp_args: Vec<String>,
    pub delete_after_download: bool,
    pub audio_format: String,
    pub merge_format: String,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub instagram_endpoint: String,
    pub tiktok_feed_endpoint: String
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ytdlp_args: Vec::new(),
            delete_after_download: false,
            audio_format: "mp3".to_string(),
            merge_format: "mp4".to_string(),
            http_timeout: Duration::from_secs(30),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
            instagram_endpoint: INSTAGRAM_ENDPOINT.to_string(),
            tiktok_feed_endpoint: TIKTOK_FEED_ENDPOINT.to_string()
        }
    }
}

impl Config {
    /// Reads `DOWNLIB_*` variables over the defaults. Unparseable values are
    /// logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("DOWNLIB_YTDLP_PATH").filter(|p| !p.is_empty()) {
            config.ytdlp_path = PathBuf::from(path);
        } else if let Some(dir) = lookup("DOWNLIB_BIN_DIR").filter(|d| !d.is_empty()) {
            let provisioned = Provisioner::new(dir).binary_path();
            if provisioned.exists() {
                config.ytdlp_path = provisioned;
            }
        }

        if let Some(args) = lookup("DOWNLIB_YTDLP_ARGS") {
            config.ytdlp_args = args.split_whitespace().map(String::from).collect();
        }

        if let Some(value) = lookup("DOWNLIB_DELETE_AFTER_DOWNLOAD") {
            match parse_bool(&value) {
                Some(flag) => config.delete_after_download = flag,
                None => tracing::warn!("ignoring DOWNLIB_DELETE_AFTER_DOWNLOAD={}", value)
            }
        }

        if let Some(secs) = parse_number(&lookup, "DOWNLIB_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_number(&lookup, "DOWNLIB_RETRY_ATTEMPTS") {
            config.retry.attempts = u32::try_from(attempts).unwrap_or(u32::MAX).max(1);
        }
        if let Some(millis) = parse_number(&lookup, "DOWNLIB_RETRY_DELAY_MS") {
            config.retry.base_delay = Duration::from_millis(millis);
        }

        config
    }

    pub fn with_ytdlp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ytdlp_path = path.into();
        self
    }

    pub fn with_ytdlp_args(mut self, args: Vec<String>) -> Self {
        self.ytdlp_args = args;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn delete_after_download(mut self, delete: bool) -> Self {
        self.delete_after_download = delete;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("ignoring {}={}", key, value);
            None
        }
    }
}
