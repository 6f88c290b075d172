//! Platforms downloaded by running yt-dlp.

use std::path::Path;

use bytes::Bytes;
use yt_dlp::{Container, DownloadOptions, InfoJson, OutputFormat, OutputTemplate};

use crate::cleanup::{ensure_dir, remove_all_quietly};
use crate::client::Downlib;
use crate::error::{Error, Result};
use crate::platform::{self, Platform};
use crate::types::{Download, DownloadedItem, RequestOptions};

pub const YOUTUBE_VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// How yt-dlp is driven for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolProfile {
    pub platform: Platform,
    /// `-f` selector used unless audio is extracted.
    pub video_format: Option<&'static str>,
    pub always_audio: bool
}

impl ToolProfile {
    pub fn for_platform(platform: Platform) -> Option<Self> {
        let profile = |video_format, always_audio| {
            Some(Self {
                platform,
                video_format,
                always_audio
            })
        };
        match platform {
            Platform::YouTube => profile(Some(YOUTUBE_VIDEO_FORMAT), false),
            Platform::SoundCloud => profile(None, true),
            Platform::Twitter
            | Platform::Facebook
            | Platform::Twitch
            | Platform::Dailymotion
            | Platform::Reddit
            | Platform::Telegram => profile(None, false),
            Platform::Instagram | Platform::TikTok | Platform::Unknown | Platform::InvalidUrl => None
        }
    }

    fn options(&self, config: &crate::Config, request: RequestOptions) -> DownloadOptions {
        let options = DownloadOptions::new().container(Container::Custom(config.merge_format.clone()));
        if request.audio_only || self.always_audio {
            options.extract_audio(true).audio_format(config.audio_format.clone())
        } else if let Some(format) = self.video_format {
            options.format(OutputFormat::Custom(format.to_string()))
        } else {
            options
        }
    }
}

impl Downlib {
    pub async fn download_from_youtube(
        &self,
        url: &str,
        save_dir: impl AsRef<Path>,
        options: RequestOptions
    ) -> Result<Download> {
        self.download_with_tool(Platform::YouTube, url, save_dir, options).await
    }

    pub async fn download_from_twitter(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::Twitter, url, save_dir, RequestOptions::default())
            .await
    }

    pub async fn download_from_facebook(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::Facebook, url, save_dir, RequestOptions::default())
            .await
    }

    pub async fn download_from_twitch(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::Twitch, url, save_dir, RequestOptions::default())
            .await
    }

    pub async fn download_from_dailymotion(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::Dailymotion, url, save_dir, RequestOptions::default())
            .await
    }

    /// Always extracts audio.
    pub async fn download_from_soundcloud(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::SoundCloud, url, save_dir, RequestOptions::default())
            .await
    }

    pub async fn download_from_reddit(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::Reddit, url, save_dir, RequestOptions::default())
            .await
    }

    /// Public channel posts only (`t.me/<channel>/<id>`).
    pub async fn download_from_telegram(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<Download> {
        self.download_with_tool(Platform::Telegram, url, save_dir, RequestOptions::default())
            .await
    }

    pub(crate) async fn download_with_tool(
        &self,
        platform: Platform,
        url: &str,
        save_dir: impl AsRef<Path>,
        options: RequestOptions
    ) -> Result<Download> {
        let profile = ToolProfile::for_platform(platform).ok_or_else(|| Error::UnsupportedUrl(url.to_string()))?;
        self.run_tool(profile, url, save_dir.as_ref(), options).await
    }

    /// Validates, runs yt-dlp once, then reads back every entry it wrote for
    /// this run's token.
    ///
    /// Files are only deleted after every entry was read successfully; a
    /// failed run leaves the directory as yt-dlp left it.
    pub async fn run_tool(
        &self,
        profile: ToolProfile,
        url: &str,
        save_dir: &Path,
        options: RequestOptions
    ) -> Result<Download> {
        let url = platform::validate(profile.platform, url)?;
        ensure_dir(save_dir).await?;

        let template = OutputTemplate::new(save_dir, crate::new_token());
        let download_options = profile.options(self.config(), options);

        tracing::info!(platform = %profile.platform, "downloading {}", url);
        let run = self
            .ytdlp()
            .download_json(url.as_str(), &template, &download_options)
            .await
            .map_err(|e| Error::from_tool(e, url.as_str()))?;
        let command = run.command;

        let artifacts = template
            .collect()
            .await
            .map_err(|e| Error::from_output(e, &command))?;
        if artifacts.is_empty() {
            return Err(Error::parse(&command, "yt-dlp exited successfully but wrote no .info.json"));
        }

        let mut items = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let mut metadata = InfoJson::read(&artifact.info_json)
                .await
                .map_err(|e| Error::from_output(e, &command))?;
            if metadata.is_playlist() {
                tracing::debug!("skipping playlist sidecar {}", artifact.info_json.display());
                continue;
            }
            metadata.strip_bulky();

            let media = artifact.media.as_ref().ok_or_else(|| {
                Error::parse(&command, format!("no media file next to {}", artifact.info_json.display()))
            })?;
            let content = tokio::fs::read(media)
                .await
                .map_err(|e| Error::parse(&command, format!("cannot read {}: {}", media.display(), e)))?;
            if content.is_empty() {
                return Err(Error::parse(&command, format!("{} is empty", media.display())));
            }

            items.push(DownloadedItem {
                metadata,
                content: Bytes::from(content),
                path: media.clone()
            });
        }

        if items.is_empty() {
            return Err(Error::parse(&command, "yt-dlp wrote only playlist metadata, no entries"));
        }
        if run.records.len() != items.len() {
            tracing::warn!(
                records = run.records.len(),
                entries = items.len(),
                "yt-dlp printed a different number of records than it wrote entries"
            );
        }

        if self.config().delete_after_download {
            for artifact in &artifacts {
                remove_all_quietly(artifact.paths()).await;
            }
        }

        Ok(Download {
            platform: profile.platform,
            command,
            items
        })
    }
}
