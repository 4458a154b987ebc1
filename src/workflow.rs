use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use log::{error, info, warn};
use scopeguard::defer;
use uuid::Uuid;

use crate::config::{Config, MAX_DURATION_SECS, MAX_FILE_SIZE};
use crate::error::FetchError;
use crate::extractor::{ExtractError, Extractor};
use crate::models::{Delivered, DownloadedAsset, VideoMetadata, VideoRequest};

const FALLBACK_EXT: &str = "mp4";

/// Sends a finished download to the user.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send_video(
        &self,
        asset: &DownloadedAsset,
        metadata: &VideoMetadata,
        caption: &str,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct Limits {
    pub max_duration_secs: u64,
    pub max_file_size: u64,
    pub extraction_timeout: Duration,
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_duration_secs: MAX_DURATION_SECS,
            max_file_size: MAX_FILE_SIZE,
            extraction_timeout: config.extraction_timeout,
        }
    }
}

/// Probe, gate, download, gate again, deliver, and always clean up after itself.
#[derive(Debug)]
pub struct Workflow<E> {
    extractor: E,
    work_dir: PathBuf,
    limits: Limits,
}

impl<E: Extractor> Workflow<E> {
    pub fn new(extractor: E, work_dir: impl Into<PathBuf>, limits: Limits) -> Self {
        Self {
            extractor,
            work_dir: work_dir.into(),
            limits,
        }
    }

    pub async fn run<D>(&self, request: &VideoRequest, delivery: &D) -> Result<Delivered, FetchError>
    where
        D: Delivery + ?Sized,
    {
        info!("Probing {}", request.url);
        let info = self
            .bounded(self.extractor.probe(&request.url))
            .await
            .map_err(|err| FetchError::ExtractionFailed(err.to_string()))?;
        let metadata = VideoMetadata::from_probe(info);
        info!(
            "Probed {}: {:?} ({}s)",
            request.url, metadata.title, metadata.duration_secs
        );

        if metadata.duration_secs > self.limits.max_duration_secs {
            info!(
                "Rejecting {}: {}s is over the {}s limit",
                request.url, metadata.duration_secs, self.limits.max_duration_secs
            );
            return Err(FetchError::DurationExceeded {
                max_secs: self.limits.max_duration_secs,
            });
        }

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(FetchError::unexpected)?;

        // Working files are named by request, never by title
        let token = Uuid::new_v4().simple().to_string();
        let work_dir = self.work_dir.as_path();
        defer! {
            remove_request_files(work_dir, &token);
        };

        let template = work_dir.join(format!("{}.%(ext)s", token));
        info!("Fetching {} to {}", request.url, template.display());
        self.bounded(self.extractor.fetch(&request.url, &template))
            .await
            .map_err(|err| FetchError::ExtractionFailed(err.to_string()))?;

        let path = locate_asset(work_dir, &token, &metadata.ext)
            .await
            .ok_or(FetchError::AssetNotFound)?;
        let size = tokio::fs::metadata(&path)
            .await
            .map_err(FetchError::unexpected)?
            .len();
        info!(
            "Downloaded {} ({})",
            path.display(),
            bytesize::to_string(size, true)
        );

        if size > self.limits.max_file_size {
            info!(
                "Rejecting {}: {} is over the size limit",
                request.url,
                bytesize::to_string(size, true)
            );
            return Err(FetchError::SizeExceeded {
                max_bytes: self.limits.max_file_size,
            });
        }

        let asset = DownloadedAsset { path, size };
        let caption = build_caption(&metadata.title);
        delivery
            .send_video(&asset, &metadata, &caption)
            .await
            .map_err(FetchError::unexpected)?;

        Ok(Delivered {
            title: metadata.title,
            size,
        })
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, ExtractError>
    where
        F: Future<Output = Result<T, ExtractError>>,
    {
        let timeout = self.limits.extraction_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Extractor call timed out after {}s", timeout.as_secs());
                Err(ExtractError::TimedOut(timeout))
            }
        }
    }
}

/// Caption for the delivered video, in HTML parse mode.
pub fn build_caption(title: &str) -> String {
    format!(
        "🎵 <b>{}</b>\n\n✅ Downloaded via TikTok Bot",
        html_escape::encode_text(title)
    )
}

/// The file the template should have produced, or any of this request's files
/// with the expected extension if the extractor named it differently.
async fn locate_asset(work_dir: &Path, token: &str, ext: &str) -> Option<PathBuf> {
    let expected = work_dir.join(format!("{}.{}", token, ext));
    if tokio::fs::try_exists(&expected).await.unwrap_or(false) {
        return Some(expected);
    }

    warn!(
        "{} not found, scanning {} for the download",
        expected.display(),
        work_dir.display()
    );

    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        Err(err) => {
            error!("Failed to read {}: {}", work_dir.display(), err);
            return None;
        }
    };

    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let belongs = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(token))
            .unwrap_or(false);
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(ext) || e.eq_ignore_ascii_case(FALLBACK_EXT))
            .unwrap_or(false);
        if belongs && matches_ext {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates.into_iter().next()
}

/// Best effort: every file this request produced, partial ones included.
///
/// Called from a drop guard, so it has to stay synchronous. It lists one directory
/// that only holds in-flight downloads and unlinks at most a few files.
fn remove_request_files(work_dir: &Path, token: &str) {
    let entries = match std::fs::read_dir(work_dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!("Cleanup error: cannot read {}: {}", work_dir.display(), err);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let belongs = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(token))
            .unwrap_or(false);
        if !belongs {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => info!("Removed {}", path.display()),
            Err(err) => error!("Cleanup error: cannot remove {}: {}", path.display(), err),
        }
    }
}
