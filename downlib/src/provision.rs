use std::io::Read;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::cleanup::remove_quietly;
use crate::error::ProvisionError;

pub const RELEASE_BASE_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";

type Result<T> = std::result::Result<T, ProvisionError>;

/// A yt-dlp executable ready to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedBinary {
    pub path: PathBuf,
    pub os: String,
    pub arch: String
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Executable,
    Zip,
    TarGz,
    TarXz
}

impl AssetKind {
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(".zip") {
            AssetKind::Zip
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            AssetKind::TarGz
        } else if name.ends_with(".tar.xz") {
            AssetKind::TarXz
        } else {
            AssetKind::Executable
        }
    }
}

/// Release asset for an `(os, arch)` pair as reported by `std::env::consts`.
pub fn release_asset(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Some("yt-dlp_linux"),
        ("linux", "aarch64") => Some("yt-dlp_linux_aarch64"),
        ("linux", "arm") => Some("yt-dlp_linux_armv7l"),
        ("windows", "x86_64" | "aarch64") => Some("yt-dlp.exe"),
        ("windows", "x86") => Some("yt-dlp_x86.exe"),
        ("macos", _) => Some("yt-dlp_macos"),
        _ => None
    }
}

/// Installs yt-dlp into a directory the first time it is asked for.
#[derive(Debug, Clone)]
pub struct Provisioner {
    dir: PathBuf,
    base_url: String,
    client: reqwest::Client,
    os: String,
    arch: String,
    asset: Option<String>
}

impl Provisioner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::for_host(dir, std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn for_host(dir: impl Into<PathBuf>, os: &str, arch: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: RELEASE_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            os: os.to_string(),
            arch: arch.to_string(),
            asset: None
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the asset picked from the release table, e.g. to fetch an archive build.
    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(asset.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn binary_name(&self) -> &'static str {
        if self.os == "windows" { "yt-dlp.exe" } else { "yt-dlp" }
    }

    /// Where the executable lives once provisioned. Does not touch the filesystem.
    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(self.binary_name())
    }

    fn asset_name(&self) -> Result<String> {
        if let Some(asset) = &self.asset {
            return Ok(asset.clone());
        }
        release_asset(&self.os, &self.arch)
            .map(String::from)
            .ok_or_else(|| ProvisionError::Unsupported {
                os: self.os.clone(),
                arch: self.arch.clone()
            })
    }

    fn provisioned(&self, path: PathBuf) -> ProvisionedBinary {
        ProvisionedBinary {
            path,
            os: self.os.clone(),
            arch: self.arch.clone()
        }
    }

    /// Returns the installed binary, downloading it first if it is missing.
    ///
    /// The download is staged under a unique hidden name and renamed into
    /// place, so a concurrent caller sees either nothing or a complete file.
    pub async fn ensure(&self) -> Result<ProvisionedBinary> {
        let path = self.binary_path();
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("yt-dlp already provisioned at {}", path.display());
            return Ok(self.provisioned(path));
        }

        let asset = self.asset_name()?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), asset);

        tokio::fs::create_dir_all(&self.dir).await?;
        let token = crate::new_token();
        let download_path = self.dir.join(format!(".{token}.download"));
        let staged_path = self.dir.join(format!(".{token}.{}", self.binary_name()));

        tracing::info!("Downloading yt-dlp from {}", url);
        let installed = self
            .install(&url, &asset, &download_path, &staged_path, &path)
            .await;

        if installed.is_err() {
            remove_quietly(&download_path).await;
            remove_quietly(&staged_path).await;
        }
        installed?;

        tracing::info!("yt-dlp installed to {}", path.display());
        Ok(self.provisioned(path))
    }

    async fn install(
        &self,
        url: &str,
        asset: &str,
        download_path: &Path,
        staged_path: &Path,
        final_path: &Path
    ) -> Result<()> {
        self.download(url, download_path).await?;

        match AssetKind::from_name(asset) {
            AssetKind::Executable => tokio::fs::rename(download_path, staged_path).await?,
            kind => {
                let candidates = vec![self.binary_name().to_string(), asset_stem(asset).to_string()];
                extract(kind, download_path, staged_path, candidates).await?;
                tokio::fs::remove_file(download_path).await?;
            }
        }

        mark_executable(staged_path).await?;
        clear_quarantine(staged_path).await;
        tokio::fs::rename(staged_path, final_path).await?;
        Ok(())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let failed = |reason: String| ProvisionError::Download {
            url: url.to_string(),
            reason
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| failed(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn asset_stem(asset: &str) -> &str {
    [".tar.gz", ".tar.xz", ".tgz", ".zip"]
        .iter()
        .find_map(|ext| asset.strip_suffix(ext))
        .unwrap_or(asset)
}

/// Copies the first archive entry whose file name is one of `candidates` to `dest`.
async fn extract(kind: AssetKind, archive: &Path, dest: &Path, candidates: Vec<String>) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let archive_for_error = archive.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive)?;
        let failed = |reason: String| ProvisionError::Extract {
            path: archive.clone(),
            reason
        };
        let found = match kind {
            AssetKind::Zip => extract_zip(file, &dest, &candidates).map_err(|e| failed(e.to_string()))?,
            AssetKind::TarGz => extract_tar(flate2::read::GzDecoder::new(file), &dest, &candidates)?,
            AssetKind::TarXz => extract_tar(xz2::read::XzDecoder::new(file), &dest, &candidates)?,
            AssetKind::Executable => false
        };
        if found {
            Ok(())
        } else {
            Err(failed(format!("no entry named {}", candidates.join(" or "))))
        }
    })
    .await
    .map_err(|e| ProvisionError::Extract {
        path: archive_for_error,
        reason: e.to_string()
    })?
}

fn entry_matches(entry_path: &str, candidates: &[String]) -> bool {
    Path::new(entry_path)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| candidates.iter().any(|c| c == name))
}

fn extract_zip(file: std::fs::File, dest: &Path, candidates: &[String]) -> zip::result::ZipResult<bool> {
    let mut archive = zip::ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.is_dir() && entry_matches(entry.name(), candidates) {
            let mut out = std::fs::File::create(dest)?;
            std::io::copy(&mut entry, &mut out)?;
            return Ok(true);
        }
    }
    Ok(false)
}

fn extract_tar(reader: impl Read, dest: &Path, candidates: &[String]) -> std::io::Result<bool> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.to_string_lossy().to_string();
        if entry_matches(&path, candidates) {
            let mut out = std::fs::File::create(dest)?;
            std::io::copy(&mut entry, &mut out)?;
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(target_os = "macos")]
async fn clear_quarantine(path: &Path) {
    let _ = tokio::process::Command::new("xattr")
        .args(["-d", "com.apple.quarantine"])
        .arg(path)
        .output()
        .await;
}

#[cfg(not(target_os = "macos"))]
async fn clear_quarantine(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BINARY: &[u8] = b"#!/bin/sh\necho 2024.12.23\n";

    fn zip_bytes(name: &str, data: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn tar_gz_bytes(name: &str, data: &[u8]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, data).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with('.'))
            .collect()
    }

    #[test]
    fn test_release_table() {
        assert_eq!(release_asset("linux", "x86_64"), Some("yt-dlp_linux"));
        assert_eq!(release_asset("linux", "aarch64"), Some("yt-dlp_linux_aarch64"));
        assert_eq!(release_asset("linux", "arm"), Some("yt-dlp_linux_armv7l"));
        assert_eq!(release_asset("windows", "aarch64"), Some("yt-dlp.exe"));
        assert_eq!(release_asset("windows", "x86"), Some("yt-dlp_x86.exe"));
        assert_eq!(release_asset("macos", "aarch64"), Some("yt-dlp_macos"));
        assert_eq!(release_asset("freebsd", "x86_64"), None);
        assert_eq!(release_asset("linux", "riscv64"), None);
    }

    #[test]
    fn test_asset_kind() {
        assert_eq!(AssetKind::from_name("yt-dlp_linux"), AssetKind::Executable);
        assert_eq!(AssetKind::from_name("yt-dlp_macos.zip"), AssetKind::Zip);
        assert_eq!(AssetKind::from_name("yt-dlp.tar.gz"), AssetKind::TarGz);
        assert_eq!(AssetKind::from_name("yt-dlp.tar.xz"), AssetKind::TarXz);
        assert_eq!(asset_stem("yt-dlp_macos.zip"), "yt-dlp_macos");
    }

    #[test]
    fn test_binary_path_per_os() {
        let linux = Provisioner::for_host("/opt/bin", "linux", "x86_64");
        assert_eq!(linux.binary_path(), PathBuf::from("/opt/bin/yt-dlp"));
        let windows = Provisioner::for_host("/opt/bin", "windows", "x86_64");
        assert_eq!(windows.binary_path(), PathBuf::from("/opt/bin/yt-dlp.exe"));
    }

    #[tokio::test]
    async fn test_unsupported_host_is_not_retriable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Provisioner::for_host(dir.path(), "plan9", "mips")
            .ensure()
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Unsupported { .. }));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_existing_binary_is_returned_without_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yt-dlp"), BINARY).unwrap();

        let provisioned = Provisioner::for_host(dir.path(), "linux", "x86_64")
            .with_base_url("http://127.0.0.1:9")
            .ensure()
            .await
            .unwrap();
        assert_eq!(provisioned.path, dir.path().join("yt-dlp"));
        assert_eq!(provisioned.os, "linux");
        assert_eq!(std::fs::read(&provisioned.path).unwrap(), BINARY);
    }

    #[tokio::test]
    async fn test_downloads_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/yt-dlp_linux")
            .with_status(200)
            .with_body(BINARY)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::for_host(dir.path(), "linux", "x86_64").with_base_url(server.url());

        let first = provisioner.ensure().await.unwrap();
        let second = provisioner.ensure().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first.path).unwrap(), BINARY);
        assert!(leftovers(dir.path()).is_empty());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&first.path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_leaves_nothing_behind() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/yt-dlp_linux_aarch64")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = Provisioner::for_host(dir.path(), "linux", "aarch64")
            .with_base_url(server.url())
            .ensure()
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
        assert!(err.is_retriable());
        assert!(!dir.path().join("yt-dlp").exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_zip_asset_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/yt-dlp_macos.zip")
            .with_status(200)
            .with_body(zip_bytes("yt-dlp_macos", BINARY))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provisioned = Provisioner::for_host(dir.path(), "macos", "aarch64")
            .with_base_url(server.url())
            .with_asset("yt-dlp_macos.zip")
            .ensure()
            .await
            .unwrap();
        assert_eq!(std::fs::read(&provisioned.path).unwrap(), BINARY);
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_tar_gz_asset_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/yt-dlp.tar.gz")
            .with_status(200)
            .with_body(tar_gz_bytes("yt-dlp/yt-dlp", BINARY))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provisioned = Provisioner::for_host(dir.path(), "linux", "x86_64")
            .with_base_url(server.url())
            .with_asset("yt-dlp.tar.gz")
            .ensure()
            .await
            .unwrap();
        assert_eq!(std::fs::read(&provisioned.path).unwrap(), BINARY);
    }

    #[tokio::test]
    async fn test_archive_without_binary_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/tools.zip")
            .with_status(200)
            .with_body(zip_bytes("README.md", b"hello"))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = Provisioner::for_host(dir.path(), "linux", "x86_64")
            .with_base_url(server.url())
            .with_asset("tools.zip")
            .ensure()
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Extract { .. }));
        assert!(leftovers(dir.path()).is_empty());
    }
}
