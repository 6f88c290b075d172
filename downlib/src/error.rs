use std::path::PathBuf;

use crate::platform::Platform;

/// Broad failure category, independent of which layer produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Subprocess,
    Parse,
    Network,
    Provisioning,
    Io
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {platform} URL: {url}")]
    InvalidUrl { platform: Platform, url: String },

    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("`{command}` failed{}: {diagnostic}", exit_suffix(.code))]
    Subprocess {
        command: String,
        code: Option<i32>,
        diagnostic: String
    },

    #[error("could not read the result of `{command}`: {reason}")]
    Parse { command: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("no media found for {0}")]
    NoMedia(String),

    #[error("could not resolve {0}")]
    Unresolved(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error)
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidUrl { .. } | Error::UnsupportedUrl(_) => ErrorKind::InvalidInput,
            Error::Subprocess { .. } => ErrorKind::Subprocess,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Http(_) | Error::HttpStatus { .. } | Error::NoMedia(_) | Error::Unresolved(_) => {
                ErrorKind::Network
            }
            Error::Provision(_) => ErrorKind::Provisioning,
            Error::Io(_) => ErrorKind::Io
        }
    }

    /// Whether trying the same call again could succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Unresolved(_) | Error::Io(_) => true,
            Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Error::Provision(err) => err.is_retriable(),
            Error::InvalidUrl { .. }
            | Error::UnsupportedUrl(_)
            | Error::Subprocess { .. }
            | Error::Parse { .. }
            | Error::NoMedia(_) => false
        }
    }

    pub(crate) fn parse(command: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            command: command.to_string(),
            reason: reason.into()
        }
    }

    /// Maps a yt-dlp wrapper error onto the taxonomy, attaching the command line.
    pub(crate) fn from_tool(err: yt_dlp::Error, command: &str) -> Self {
        match err {
            yt_dlp::Error::CommandFailed {
                command,
                code,
                stderr
            } => Error::Subprocess {
                command,
                code: Some(code),
                diagnostic: stderr
            },
            yt_dlp::Error::SpawnFailed { command, source } => Error::Subprocess {
                command,
                code: None,
                diagnostic: source.to_string()
            },
            yt_dlp::Error::BinaryNotExecutable(path) => Error::Subprocess {
                command: path.display().to_string(),
                code: None,
                diagnostic: "binary is not executable".to_string()
            },
            yt_dlp::Error::OutputTruncated { command } => Error::Subprocess {
                command,
                code: None,
                diagnostic: "output ended before the process exited".to_string()
            },
            yt_dlp::Error::ExecutionFailed(source) => Error::Subprocess {
                command: command.to_string(),
                code: None,
                diagnostic: source.to_string()
            },
            err @ (yt_dlp::Error::InfoJsonInvalid { .. } | yt_dlp::Error::InfoJsonNotObject(_)) => {
                Error::parse(command, err.to_string())
            }
        }
    }

    /// Maps errors raised while reading back what a finished run wrote. The
    /// process is gone by then, so I/O failures are filesystem errors.
    pub(crate) fn from_output(err: yt_dlp::Error, command: &str) -> Self {
        match err {
            yt_dlp::Error::ExecutionFailed(source) => Error::Io(source),
            other => Error::from_tool(other, command)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("no yt-dlp build for {os}/{arch}")]
    Unsupported { os: String, arch: String },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("failed to extract {path}: {reason}")]
    Extract { path: PathBuf, reason: String },

    #[error("provisioning I/O error: {0}")]
    Io(#[from] std::io::Error)
}

impl ProvisionError {
    pub fn is_retriable(&self) -> bool {
        !matches!(self, ProvisionError::Unsupported { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::ref_option)]
fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|code| format!(" with exit code {code}")).unwrap_or_default()
}
