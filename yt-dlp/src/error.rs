use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("yt-dlp binary not executable: {0}")]
    BinaryNotExecutable(PathBuf),

    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error
    },

    #[error("failed to execute yt-dlp: {0}")]
    ExecutionFailed(#[from] std::io::Error),

    #[error("yt-dlp command failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String
    },

    #[error("yt-dlp output ended before the process exited")]
    OutputTruncated { command: String },

    #[error("failed to parse info json {path}: {source}")]
    InfoJsonInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error
    },

    #[error("info json {0} is not a JSON object")]
    InfoJsonNotObject(PathBuf)
}

pub type Result<T> = std::result::Result<T, Error>;
