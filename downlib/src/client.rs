use yt_dlp::YtDlp;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::{self, Platform};
use crate::types::{DownloadRequest, Media};

/// Entry point: one instance per configuration, shareable across tasks.
#[derive(Debug, Clone)]
pub struct Downlib {
    config: Config,
    ytdlp: YtDlp,
    http: reqwest::Client
}

impl Downlib {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;

        let mut ytdlp = YtDlp::with_binary(config.ytdlp_path.clone());
        if !config.ytdlp_args.is_empty() {
            ytdlp.set_extra_args(config.ytdlp_args.clone());
        }

        Ok(Self { config, ytdlp, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ytdlp(&self) -> &YtDlp {
        &self.ytdlp
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn check_url_type(&self, url: &str) -> Platform {
        platform::classify(url)
    }

    /// Classifies `request.url` and runs the matching download.
    pub async fn download(&self, request: &DownloadRequest) -> Result<Media> {
        let platform = platform::classify(&request.url);
        tracing::debug!(%platform, "dispatching {}", request.url);

        let dir = &request.target_directory;
        match platform {
            Platform::InvalidUrl | Platform::Unknown => Err(Error::UnsupportedUrl(request.url.clone())),
            Platform::Instagram => self.download_from_instagram(&request.url, dir).await.map(Media::Scraped),
            Platform::TikTok => self.download_from_tiktok(&request.url, dir).await.map(Media::Scraped),
            tool => self
                .download_with_tool(tool, &request.url, dir, request.options)
                .await
                .map(Media::Tool)
        }
    }
}
