//! Async Rust wrapper for the yt-dlp CLI.
//!
//! Downloads run with `--print-json --write-info-json` and an output template
//! keyed by a caller-chosen token, so every file a run produced can be found
//! again and paired with its metadata sidecar.
//!
//! # Example
//!
//! ```no_run
//! use yt_dlp::{DownloadOptions, InfoJson, OutputTemplate, YtDlp};
//!
//! #[tokio::main]
//! async fn main() -> yt_dlp::Result<()> {
//!     let client = YtDlp::new();
//!
//!     let version = client.check_binary().await?;
//!     println!("yt-dlp version: {}", version);
//!
//!     let template = OutputTemplate::new("./downloads", "run-1");
//!     let run = client
//!         .download_json("https://www.youtube.com/shorts/H_IwLWa64gs", &template, &DownloadOptions::new())
//!         .await?;
//!     println!("{} record(s) via `{}`", run.records.len(), run.command);
//!
//!     for artifact in template.collect().await? {
//!         let info = InfoJson::read(&artifact.info_json).await?;
//!         println!("{:?} -> {:?}", info.title(), artifact.media);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod command;
pub mod error;
mod output;
pub mod types;

pub use client::{YtDlp, strip_report_footer};
pub use error::{Error, Result};
pub use output::{Artifact, OutputTemplate};
pub use types::{Container, DownloadOptions, InfoJson, JsonEvent, JsonRun, OutputFormat};
