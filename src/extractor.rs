use std::{path::Path, process::Stdio, time::Duration};

use async_trait::async_trait;
use log::{debug, error};
use thiserror::Error;
use tokio::process::Command;

use crate::models::ProbeInfo;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to start {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Failed(String),
    #[error("unreadable video info: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Resolves a URL into metadata and downloads the media behind it.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Query metadata only, nothing is written to disk.
    async fn probe(&self, url: &str) -> Result<ProbeInfo, ExtractError>;

    /// Download the media, naming the file after `template`
    /// (`%(ext)s` is replaced with the real extension).
    async fn fetch(&self, url: &str, template: &Path) -> Result<(), ExtractError>;
}

/// Extractor backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    bin: String,
}

impl YtDlp {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ExtractError> {
        debug!("Running {} {:?}", self.bin, args);

        let output = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            let message = stderr_summary(&output.stderr)
                .unwrap_or_else(|| format!("{} exited with {}", self.bin, output.status));
            error!("{} failed: {}", self.bin, message);
            return Err(ExtractError::Failed(message));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn probe(&self, url: &str) -> Result<ProbeInfo, ExtractError> {
        let stdout = self
            .run(&["-J", "--no-playlist", "--no-warnings", url])
            .await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    async fn fetch(&self, url: &str, template: &Path) -> Result<(), ExtractError> {
        let template = template.to_string_lossy();
        self.run(&[
            "-f",
            "best",
            "--no-playlist",
            "--no-warnings",
            "--quiet",
            "-o",
            &template,
            url,
        ])
        .await?;
        Ok(())
    }
}

/// Pick the line of stderr worth showing to a user.
fn stderr_summary(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    lines
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix("ERROR:"))
        .map(|line| line.trim().to_string())
        .or_else(|| lines.last().map(|line| line.to_string()))
}
