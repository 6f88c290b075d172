//! Download media from social platforms through one façade.
//!
//! URLs are classified by host. YouTube, Twitter/X, Facebook, Twitch,
//! Dailymotion, SoundCloud, Reddit and Telegram go through yt-dlp; Instagram
//! and TikTok are fetched over HTTP directly. Every download ends in memory
//! as `Bytes` plus whatever metadata the platform reported.
//!
//! # Example
//!
//! ```no_run
//! use downlib::{Config, DownloadRequest, Downlib, Media};
//!
//! #[tokio::main]
//! async fn main() -> downlib::Result<()> {
//!     let downlib = Downlib::new(Config::from_env())?;
//!
//!     let request = DownloadRequest::new("https://www.youtube.com/shorts/H_IwLWa64gs", "./downloads");
//!     match downlib.download(&request).await? {
//!         Media::Tool(download) => {
//!             for item in &download.items {
//!                 println!("{:?}: {} bytes", item.metadata.title(), item.content.len());
//!             }
//!         }
//!         Media::Scraped(post) => println!("{} file(s) from {}", post.media.len(), post.url)
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cleanup;
mod client;
pub mod config;
mod downloader;
pub mod error;
pub mod platform;
pub mod provision;
mod retry;
pub mod scrape;
pub mod types;

pub use client::Downlib;
pub use config::{Config, RetryPolicy};
pub use downloader::{ToolProfile, YOUTUBE_VIDEO_FORMAT};
pub use error::{Error, ErrorKind, ProvisionError, Result};
pub use platform::{Platform, classify};
pub use provision::{ProvisionedBinary, Provisioner};
pub use types::{
    Download, DownloadRequest, DownloadedItem, Media, MediaKind, RequestOptions, ScrapedMedia, ScrapedPost
};

/// Fresh per-call token; time-ordered so files from one session sort together.
pub(crate) fn new_token() -> String {
    uuid7::uuid7().to_string()
}
