use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use futures_core::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;

use crate::command::CommandBuilder;
use crate::error::{Error, Result};
use crate::output::OutputTemplate;
use crate::types::{DownloadOptions, JsonEvent, JsonRun};

/// Marker yt-dlp appends to most errors, followed by a link to its bug tracker.
const REPORT_FOOTER: &str = "please report this issue on";

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    extra_args: Vec<String>
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
            extra_args: Vec::new()
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn set_binary(&mut self, path: PathBuf) {
        self.binary = path;
    }

    /// Arguments placed right after the binary, ahead of everything else.
    pub fn set_extra_args(&mut self, args: Vec<String>) {
        self.extra_args = args;
    }

    pub async fn check_binary(&self) -> Result<String> {
        let output = self.command().version().build().output().await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::BinaryNotExecutable(self.binary.clone()))
        }
    }

    /// Runs a download that prints one JSON record per entry and writes an
    /// `.info.json` sidecar next to each media file named by `template`.
    pub fn download_json_events(
        &self,
        url: &str,
        template: &OutputTemplate,
        options: &DownloadOptions
    ) -> Pin<Box<dyn Stream<Item = Result<JsonEvent>> + Send + 'static>> {
        let builder = self
            .command()
            .print_json()
            .write_info_json()
            .with_options(options)
            .output(template.template())
            .url(url);
        let binary = self.binary.clone();

        Box::pin(async_stream::try_stream! {
            let command = builder.command_line();

            tracing::debug!(
                binary = %binary.display(),
                args = ?builder.get_args(),
                "spawning yt-dlp"
            );

            let mut cmd = builder.build();
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());

            let mut child = cmd.spawn().map_err(|source| Error::SpawnFailed {
                command: command.clone(),
                source
            })?;

            yield JsonEvent::Spawned { command: command.clone() };

            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| std::io::Error::other("stderr not captured"))?;
            let stderr_task = tokio::spawn(async move {
                let mut collected = String::new();
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                loop {
                    match read_line_lossy(&mut reader, &mut buf).await {
                        Ok(Some(line)) => {
                            tracing::trace!(line = %line, "yt-dlp stderr");
                            collected.push_str(&line);
                            collected.push('\n');
                        }
                        Ok(None) => break,
                        Err(err) => {
                            tracing::warn!("stopped reading yt-dlp stderr: {}", err);
                            break;
                        }
                    }
                }
                collected
            });

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| std::io::Error::other("stdout not captured"))?;
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();

            while let Some(line) = read_line_lossy(&mut reader, &mut buf).await? {
                tracing::trace!(line = %line, "yt-dlp stdout");
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<serde_json::Value>(trimmed) {
                    Ok(value) if value.is_object() => {
                        yield JsonEvent::Record(value);
                    }
                    _ => {
                        yield JsonEvent::Line(line);
                    }
                }
            }

            let status = child.wait().await?;
            let stderr = stderr_task.await.unwrap_or_default();

            yield JsonEvent::Exited {
                code: status.code().unwrap_or(-1),
                stderr
            };
        })
    }

    /// Drives [`Self::download_json_events`] to completion.
    ///
    /// Nothing is judged until the process has exited: an empty stdout just
    /// means no record has arrived yet.
    pub async fn download_json(
        &self,
        url: &str,
        template: &OutputTemplate,
        options: &DownloadOptions
    ) -> Result<JsonRun> {
        let stream = self.download_json_events(url, template, options);
        tokio::pin!(stream);

        let mut command = String::new();
        let mut records = Vec::new();

        while let Some(event) = stream.next().await {
            match event? {
                JsonEvent::Spawned { command: line } => command = line,
                JsonEvent::Record(value) => records.push(value),
                JsonEvent::Line(line) => {
                    tracing::debug!(line = %line, "ignoring non-JSON yt-dlp output");
                }
                JsonEvent::Exited { code, stderr } => {
                    if code != 0 {
                        tracing::error!("yt-dlp process exited with code {}", code);
                        return Err(Error::CommandFailed {
                            command,
                            code,
                            stderr: strip_report_footer(&stderr)
                        });
                    }
                    return Ok(JsonRun {
                        command,
                        records,
                        stderr
                    });
                }
            }
        }

        Err(Error::OutputTruncated { command })
    }

    fn command(&self) -> CommandBuilder {
        CommandBuilder::new(&self.binary).args(self.extra_args.iter().map(String::as_str))
    }
}

/// Next newline-terminated line, with invalid UTF-8 replaced rather than rejected.
async fn read_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Removes yt-dlp's bug-report boilerplate so only the actual complaint remains.
pub fn strip_report_footer(stderr: &str) -> String {
    stderr
        .lines()
        .map(|line| match line.find(REPORT_FOOTER) {
            Some(idx) => line[..idx].trim_end().trim_end_matches(';').trim_end(),
            None => line
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
