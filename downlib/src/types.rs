use std::path::PathBuf;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};
use yt_dlp::InfoJson;

use crate::platform::Platform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub audio_only: bool
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub target_directory: PathBuf,
    pub options: RequestOptions
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, target_directory: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            target_directory: target_directory.into(),
            options: RequestOptions::default()
        }
    }

    pub fn audio_only(mut self, audio_only: bool) -> Self {
        self.options.audio_only = audio_only;
        self
    }
}

/// One entry produced by a yt-dlp run.
#[derive(Debug, Clone)]
pub struct DownloadedItem {
    /// Sidecar fields without the format listings.
    pub metadata: InfoJson,
    pub content: Bytes,
    /// Where the media file was written. Gone if delete-after-download is set.
    pub path: PathBuf
}

/// Result of a successful yt-dlp download. Always holds at least one item.
#[derive(Debug, Clone)]
pub struct Download {
    pub platform: Platform,
    pub command: String,
    pub items: Vec<DownloadedItem>
}

impl Download {
    pub fn first(&self) -> Option<&DownloadedItem> {
        self.items.first()
    }

    pub fn total_bytes(&self) -> usize {
        self.items.iter().map(|item| item.content.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Other
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type.split('/').next() {
            Some("video") => MediaKind::Video,
            Some("image") => MediaKind::Image,
            Some("audio") => MediaKind::Audio,
            _ => MediaKind::Other
        }
    }
}

/// A media file fetched directly over HTTP.
#[derive(Debug, Clone)]
pub struct ScrapedMedia {
    pub source_url: String,
    pub content_type: Option<String>,
    pub kind: MediaKind,
    pub file_name: String,
    pub content: Bytes,
    pub path: Option<PathBuf>
}

#[derive(Debug, Clone)]
pub struct ScrapedPost {
    pub platform: Platform,
    pub url: String,
    pub id: Option<String>,
    pub username: Option<String>,
    pub media: Vec<ScrapedMedia>,
    /// Media URLs that could not be fetched after retrying.
    pub failed: Vec<String>
}

/// What [`crate::Downlib::download`] produced, depending on the route taken.
#[derive(Debug, Clone)]
pub enum Media {
    Tool(Download),
    Scraped(ScrapedPost)
}

impl Media {
    pub fn platform(&self) -> Platform {
        match self {
            Media::Tool(download) => download.platform,
            Media::Scraped(post) => post.platform
        }
    }

    /// Printable description without the content buffers.
    pub fn summary(&self) -> Value {
        match self {
            Media::Tool(download) => json!({
                "platform": download.platform,
                "command": download.command,
                "items": download.items.iter().map(|item| json!({
                    "id": item.metadata.id(),
                    "title": item.metadata.title(),
                    "ext": item.metadata.ext(),
                    "path": item.path,
                    "bytes": item.content.len()
                })).collect::<Vec<_>>()
            }),
            Media::Scraped(post) => json!({
                "platform": post.platform,
                "url": post.url,
                "id": post.id,
                "username": post.username,
                "items": post.media.iter().map(|media| json!({
                    "kind": media.kind,
                    "file_name": media.file_name,
                    "content_type": media.content_type,
                    "path": media.path,
                    "bytes": media.content.len()
                })).collect::<Vec<_>>(),
                "failed": post.failed
            })
        }
    }
}
