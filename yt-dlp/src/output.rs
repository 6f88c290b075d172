use std::path::{Path, PathBuf};

use crate::error::Result;

const INFO_JSON_SUFFIX: &str = ".info.json";
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Output naming for a single invocation.
///
/// Every file yt-dlp writes is named `{token}_{id}.{ext}`, so the files of
/// one run can be found again without trusting anything printed on stdout.
#[derive(Debug, Clone)]
pub struct OutputTemplate {
    dir: PathBuf,
    token: String
}

/// One downloaded entry: its sidecar and the media file next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub info_json: PathBuf,
    pub media: Option<PathBuf>
}

impl Artifact {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.media
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.info_json.as_path()))
    }
}

impl OutputTemplate {
    pub fn new(dir: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            token: token.into()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn template(&self) -> PathBuf {
        self.dir.join(format!("{}_%(id)s.%(ext)s", self.token))
    }

    /// Lists the artifacts written for this token, ordered by file name.
    pub async fn collect(&self) -> Result<Vec<Artifact>> {
        let prefix = format!("{}_", self.token);
        let mut names = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) {
                names.push(name);
            }
        }
        names.sort();

        let artifacts = names
            .iter()
            .filter_map(|name| name.strip_suffix(INFO_JSON_SUFFIX))
            .map(|stem| Artifact {
                info_json: self.dir.join(format!("{stem}{INFO_JSON_SUFFIX}")),
                media: find_media(&names, stem).map(|name| self.dir.join(name))
            })
            .collect();

        Ok(artifacts)
    }
}

fn find_media<'a>(names: &'a [String], stem: &str) -> Option<&'a str> {
    let stem_dot = format!("{stem}.");
    let mut candidates: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(&stem_dot))
        .filter(|name| !name.ends_with(INFO_JSON_SUFFIX))
        .filter(|name| !PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
        .collect();

    // Leftover per-format fragments look like `{stem}.f137.mp4`; the merged file has a bare extension.
    candidates.sort_by_key(|name| name[stem_dot.len()..].contains('.'));
    candidates.first().copied()
}
