use std::io::ErrorKind;
use std::path::Path;

/// Creates `dir` and its parents if missing.
pub async fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}

/// Deletes `path`. Failures are logged and swallowed.
pub async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("{} already gone", path.display());
        }
        Err(e) => tracing::warn!("failed to remove {}: {}", path.display(), e)
    }
}

pub async fn remove_all_quietly<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    for path in paths {
        remove_quietly(path).await;
    }
}
