//! Direct HTTP downloads for platforms yt-dlp is not used for.

pub mod instagram;
pub mod tiktok;

use std::path::Path;

use bytes::Bytes;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;

use crate::cleanup::{ensure_dir, remove_quietly};
use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use crate::retry::with_backoff;
use crate::types::{MediaKind, ScrapedMedia};

/// A media URL plus the name its file should get.
#[derive(Debug, Clone)]
pub(crate) struct MediaTarget {
    pub url: String,
    pub file_stem: String,
    pub kind: MediaKind,
    pub fallback_ext: &'static str
}

struct Fetched {
    content_type: Option<String>,
    content: Bytes
}

/// What happened to a batch of [`MediaTarget`]s.
pub(crate) struct Batch {
    pub media: Vec<ScrapedMedia>,
    pub failures: Vec<(String, Error)>
}

impl Batch {
    /// Fails with the first error if nothing at all was fetched.
    pub fn into_parts(self) -> Result<(Vec<ScrapedMedia>, Vec<String>)> {
        let Batch { media, mut failures } = self;
        if media.is_empty() && !failures.is_empty() {
            let (_, err) = failures.swap_remove(0);
            return Err(err);
        }
        let failed = failures.into_iter().map(|(url, _)| url).collect();
        Ok((media, failed))
    }
}

pub(crate) fn ensure_success(url: &str, status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16()
        })
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<Fetched> {
    let response = client.get(url).send().await?;
    ensure_success(url, response.status())?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());
    let content = response.bytes().await?;
    if content.is_empty() {
        return Err(Error::NoMedia(url.to_string()));
    }

    Ok(Fetched {
        content_type,
        content
    })
}

/// Fetches every target concurrently. One failing target never aborts the others.
pub(crate) async fn fetch_all(client: &reqwest::Client, policy: RetryPolicy, targets: Vec<MediaTarget>) -> Batch {
    let results = join_all(
        targets
            .iter()
            .map(|target| with_backoff(policy, "media fetch", move || fetch_once(client, &target.url)))
    )
    .await;

    let mut batch = Batch {
        media: Vec::new(),
        failures: Vec::new()
    };
    for (target, result) in targets.into_iter().zip(results) {
        match result {
            Ok(fetched) => {
                let ext = fetched
                    .content_type
                    .as_deref()
                    .and_then(extension_for)
                    .unwrap_or(target.fallback_ext);
                let kind = match fetched.content_type.as_deref().map(MediaKind::from_content_type) {
                    Some(MediaKind::Other) | None => target.kind,
                    Some(kind) => kind
                };
                batch.media.push(ScrapedMedia {
                    source_url: target.url,
                    content_type: fetched.content_type,
                    kind,
                    file_name: format!("{}.{}", target.file_stem, ext),
                    content: fetched.content,
                    path: None
                });
            }
            Err(err) => {
                tracing::warn!("giving up on {}: {}", target.url, err);
                batch.failures.push((target.url, err));
            }
        }
    }
    batch
}

/// File extension for a media content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let ext = match content_type {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/jpeg" | "image/jpg" => "jpeg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/gif" => "gif",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        _ => return None
    };
    Some(ext)
}

/// Writes each item into `dir`. Files are removed right away when `delete_after` is set.
pub(crate) async fn persist(media: &mut [ScrapedMedia], dir: &Path, delete_after: bool) -> Result<()> {
    ensure_dir(dir).await?;
    for item in media.iter_mut() {
        let path = dir.join(&item.file_name);
        tokio::fs::write(&path, &item.content).await?;
        if delete_after {
            remove_quietly(&path).await;
        } else {
            item.path = Some(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1)
        }
    }

    fn target(url: String, stem: &str) -> MediaTarget {
        MediaTarget {
            url,
            file_stem: stem.to_string(),
            kind: MediaKind::Image,
            fallback_ext: "jpeg"
        }
    }

    #[test]
    fn test_into_parts_returns_first_error_when_nothing_fetched() {
        let batch = Batch {
            media: Vec::new(),
            failures: vec![
                ("https://cdn/a".to_string(), Error::NoMedia("a".to_string())),
                ("https://cdn/b".to_string(), Error::NoMedia("b".to_string())),
                ("https://cdn/c".to_string(), Error::NoMedia("c".to_string())),
            ]
        };
        let err = batch.into_parts().unwrap_err();
        assert!(matches!(err, Error::NoMedia(ref url) if url == "a"));

        let empty = Batch {
            media: Vec::new(),
            failures: Vec::new()
        };
        let (media, failed) = empty.into_parts().unwrap();
        assert!(media.is_empty());
        assert!(failed.is_empty());
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("video/mp4"), Some("mp4"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_siblings_of_failed_item() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/a.png")
            .with_status(200)
            .with_header("content-type", "image/png; charset=binary")
            .with_body("png-bytes")
            .create_async()
            .await;
        let broken = server
            .mock("GET", "/b.jpg")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let batch = fetch_all(&client, fast(), vec![
            target(format!("{}/a.png", server.url()), "post_1"),
            target(format!("{}/b.jpg", server.url()), "post_2"),
        ])
        .await;

        let (media, failed) = batch.into_parts().unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].file_name, "post_1.png");
        assert_eq!(media[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(&media[0].content[..], b"png-bytes");
        assert_eq!(failed, vec![format!("{}/b.jpg", server.url())]);
        broken.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_failed_surfaces_first_error() {
        let mut server = mockito::Server::new_async().await;
        let _gone = server.mock("GET", "/gone").with_status(404).create_async().await;

        let client = reqwest::Client::new();
        let batch = fetch_all(&client, fast(), vec![target(format!("{}/gone", server.url()), "x")]).await;
        let err = batch.into_parts().unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_persist_respects_delete_after() {
        let dir = tempfile::tempdir().unwrap();
        let item = ScrapedMedia {
            source_url: "https://cdn/x".to_string(),
            content_type: None,
            kind: MediaKind::Other,
            file_name: "x_1.bin".to_string(),
            content: Bytes::from_static(b"data"),
            path: None
        };

        let mut kept = vec![item.clone()];
        persist(&mut kept, dir.path(), false).await.unwrap();
        assert_eq!(kept[0].path, Some(dir.path().join("x_1.bin")));
        assert_eq!(std::fs::read(dir.path().join("x_1.bin")).unwrap(), b"data");

        std::fs::remove_file(dir.path().join("x_1.bin")).unwrap();
        let mut dropped = vec![item];
        persist(&mut dropped, dir.path(), true).await.unwrap();
        assert!(dropped[0].path.is_none());
        assert!(!dir.path().join("x_1.bin").exists());
    }
}
