use std::path::PathBuf;

use anyhow::Context;
use downlib::{Config, DownloadRequest, Downlib, Provisioner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: downlib [--audio] [--provision] <url>...";

struct Args {
    audio_only: bool,
    provision: bool,
    urls: Vec<String>
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        audio_only: false,
        provision: false,
        urls: Vec::new()
    };
    for arg in args {
        match arg.as_str() {
            "--audio" => parsed.audio_only = true,
            "--provision" => parsed.provision = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown flag {flag}\n{USAGE}")),
            _ => parsed.urls.push(arg)
        }
    }
    if parsed.urls.is_empty() && !parsed.provision {
        return Err(USAGE.to_string());
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "downlib=info,yt_dlp=info".into())
        )
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let mut config = Config::from_env();

    if args.provision {
        let bin_dir = std::env::var("DOWNLIB_BIN_DIR").unwrap_or_else(|_| "./bin".to_string());
        let provisioned = Provisioner::new(&bin_dir)
            .ensure()
            .await
            .with_context(|| format!("provisioning yt-dlp into {bin_dir}"))?;
        tracing::info!("Using provisioned yt-dlp at {}", provisioned.path.display());
        config.ytdlp_path = provisioned.path;
    }

    let downlib = Downlib::new(config)?;

    match downlib.ytdlp().check_binary().await {
        Ok(version) => tracing::info!("yt-dlp version: {}", version),
        Err(e) => tracing::warn!("yt-dlp not found or not executable: {}", e)
    }

    let save_dir = PathBuf::from(std::env::var("DOWNLIB_SAVE_DIR").unwrap_or_else(|_| "./downloads".to_string()));

    let mut failures = 0;
    for url in &args.urls {
        let request = DownloadRequest::new(url.as_str(), &save_dir).audio_only(args.audio_only);
        match downlib.download(&request).await {
            Ok(media) => println!("{}", media.summary()),
            Err(e) => {
                failures += 1;
                tracing::error!(kind = ?e.kind(), retriable = e.is_retriable(), "{}: {}", url, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} download(s) failed", args.urls.len());
    }
    Ok(())
}
