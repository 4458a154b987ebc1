use thiserror::Error;

/// Why a request ended without a delivered video.
///
/// The `Display` text is what the user sees in the status message.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Please send a valid TikTok URL")]
    InvalidUrl,
    #[error("Download failed: {0}")]
    ExtractionFailed(String),
    #[error("Video too long (max {} minutes)", .max_secs / 60)]
    DurationExceeded { max_secs: u64 },
    #[error("File not found")]
    AssetNotFound,
    #[error("Video too large (max {}MB)", .max_bytes / (1024 * 1024))]
    SizeExceeded { max_bytes: u64 },
    /// The cause is for the logs only.
    #[error("Sorry, I couldn't download that video. Please try again.")]
    Unexpected(String),
}

impl FetchError {
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        FetchError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_DURATION_SECS, MAX_FILE_SIZE};

    #[test]
    fn user_facing_texts() {
        assert_eq!(FetchError::InvalidUrl.to_string(), "Please send a valid TikTok URL");
        assert_eq!(
            FetchError::DurationExceeded { max_secs: MAX_DURATION_SECS }.to_string(),
            "Video too long (max 3 minutes)"
        );
        assert_eq!(
            FetchError::SizeExceeded { max_bytes: MAX_FILE_SIZE }.to_string(),
            "Video too large (max 50MB)"
        );
        assert_eq!(FetchError::AssetNotFound.to_string(), "File not found");
        assert_eq!(
            FetchError::ExtractionFailed("network unreachable".into()).to_string(),
            "Download failed: network unreachable"
        );
    }

    #[test]
    fn unexpected_hides_the_cause() {
        let err = FetchError::unexpected("disk on fire");
        assert!(!err.to_string().contains("disk on fire"));
        assert!(matches!(err, FetchError::Unexpected(cause) if cause == "disk on fire"));
    }
}
