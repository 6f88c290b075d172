use std::path::Path;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use scraper::{Html, Selector};
use serde::Deserialize;

use super::{MediaTarget, ensure_success, fetch_all, persist};
use crate::client::Downlib;
use crate::error::{Error, Result};
use crate::platform::{self, Platform};
use crate::retry::with_backoff;
use crate::types::{MediaKind, ScrapedPost};

const SCRAPER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36 Edg/115.0.1901.183";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<String>
}

/// Pulls the download anchors out of the HTML fragment the endpoint returns,
/// one per `.download-items` block.
pub fn parse_download_links(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    let (Ok(items), Ok(anchor)) = (
        Selector::parse(".download-items"),
        Selector::parse(".download-items__btn > a")
    ) else {
        return Vec::new();
    };

    document
        .select(&items)
        .filter_map(|item| item.select(&anchor).next())
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with("http"))
        .map(String::from)
        .collect()
}

async fn media_urls(client: &reqwest::Client, endpoint: &str, post_url: &str) -> Result<Vec<String>> {
    let response = client
        .post(endpoint)
        .header(ACCEPT, "*/*")
        .header(ORIGIN, "https://saveig.app")
        .header(REFERER, "https://saveig.app/")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .header(USER_AGENT, SCRAPER_USER_AGENT)
        .header("Sec-Fetch-Dest", "empty")
        .header("Sec-Fetch-Mode", "cors")
        .header("Sec-Fetch-Site", "same-origin")
        .header("X-Requested-With", "XMLHttpRequest")
        .form(&[("q", post_url), ("t", "media"), ("lang", "en")])
        .send()
        .await?;
    ensure_success(endpoint, response.status())?;

    let body: SearchResponse = response.json().await?;
    Ok(body.data.as_deref().map(parse_download_links).unwrap_or_default())
}

impl Downlib {
    /// Downloads every media item of an Instagram post through the scraping endpoint.
    pub async fn download_from_instagram(&self, url: &str, save_dir: impl AsRef<Path>) -> Result<ScrapedPost> {
        let post_url = platform::validate(Platform::Instagram, url)?;
        let config = self.config();
        let client = self.http();

        let links = with_backoff(config.retry, "Instagram search", || {
            media_urls(client, &config.instagram_endpoint, post_url.as_str())
        })
        .await?;
        if links.is_empty() {
            return Err(Error::NoMedia(url.to_string()));
        }
        tracing::debug!(count = links.len(), "instagram media links for {}", url);

        let token = crate::new_token();
        let targets = links
            .into_iter()
            .enumerate()
            .map(|(i, link)| MediaTarget {
                url: link,
                file_stem: format!("{token}_{}", i + 1),
                kind: MediaKind::Other,
                fallback_ext: "bin"
            })
            .collect();

        let (mut media, failed) = fetch_all(client, config.retry, targets).await.into_parts()?;
        persist(&mut media, save_dir.as_ref(), config.delete_after_download).await?;

        Ok(ScrapedPost {
            platform: Platform::Instagram,
            url: url.to_string(),
            id: instagram_shortcode(&post_url),
            username: None,
            media,
            failed
        })
    }
}

/// The `p/{code}`, `reel/{code}` or `tv/{code}` segment of a post URL.
fn instagram_shortcode(url: &url::Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    segments
        .windows(2)
        .find(|pair| matches!(pair[0], "p" | "reel" | "reels" | "tv"))
        .map(|pair| pair[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"
        <ul class="download-box">
          <li><div class="download-items">
            <div class="download-items__thumb"><img src="https://cdn.example/thumb1.jpg"></div>
            <div class="download-items__btn"><a href="https://cdn.example/one.mp4" title="Download Video">Download</a></div>
          </div></li>
          <li><div class="download-items">
            <div class="download-items__btn"><a href="https://cdn.example/two.jpg">Download</a></div>
            <div class="download-items__btn"><a href="https://cdn.example/two-alt.jpg">Alt</a></div>
          </div></li>
          <li><div class="download-items"><span>nothing here</span></div></li>
        </ul>"#;

    #[test]
    fn test_parse_download_links() {
        assert_eq!(parse_download_links(FRAGMENT), vec![
            "https://cdn.example/one.mp4",
            "https://cdn.example/two.jpg"
        ]);
    }

    #[test]
    fn test_parse_download_links_empty() {
        assert!(parse_download_links("").is_empty());
        assert!(parse_download_links("<p>Sorry, this post is private</p>").is_empty());
    }

    #[test]
    fn test_shortcode() {
        let url = url::Url::parse("https://www.instagram.com/p/C1a2b3c4d5e/?img_index=1").unwrap();
        assert_eq!(instagram_shortcode(&url).as_deref(), Some("C1a2b3c4d5e"));
        let url = url::Url::parse("https://www.instagram.com/reel/Cxyz/").unwrap();
        assert_eq!(instagram_shortcode(&url).as_deref(), Some("Cxyz"));
        let url = url::Url::parse("https://www.instagram.com/someone/").unwrap();
        assert_eq!(instagram_shortcode(&url), None);
    }
}
