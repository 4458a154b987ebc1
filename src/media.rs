use std::{fs::File, path::Path, time::Duration};

use log::warn;
use mp4::TrackType;

/// What Telegram wants to know about a video before it will stream it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub duration: Duration,
    pub width: i32,
    pub height: i32,
}

impl VideoInfo {
    pub fn unknown(duration_secs: u64) -> Self {
        Self {
            duration: Duration::from_secs(duration_secs),
            width: 0,
            height: 0,
        }
    }
}

/// Read duration and dimensions from an MP4 header.
pub fn read_video_info(path: &Path) -> Option<VideoInfo> {
    let file = File::open(path).ok()?;
    let reader = match mp4::read_mp4(file) {
        Ok(reader) => reader,
        Err(err) => {
            warn!("Not a readable mp4 {}: {}", path.display(), err);
            return None;
        }
    };

    let video = reader
        .tracks()
        .values()
        .find(|track| matches!(track.track_type(), Ok(TrackType::Video)))?;

    Some(VideoInfo {
        duration: reader.duration(),
        width: i32::from(video.width()),
        height: i32::from(video.height()),
    })
}

/// Same as [`read_video_info`], off the async runtime, falling back to the probed duration.
pub async fn video_info(path: &Path, probed_secs: u64) -> VideoInfo {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_video_info(&owned))
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| VideoInfo::unknown(probed_secs))
}
