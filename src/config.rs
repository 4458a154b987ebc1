use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Videos longer than this are rejected before anything is downloaded.
pub const MAX_DURATION_SECS: u64 = 180;

/// Bots cannot send attachments above 50MB.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Titles are cut to this many characters before they reach a caption.
pub const MAX_TITLE_LEN: usize = 100;

const DEFAULT_SESSION_FILE: &str = "session.bin";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_YTDLP_BIN: &str = "yt-dlp";
const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} env is not set")]
    Missing(&'static str),
    #[error("{name} env has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the process needs, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,
    pub session_file: PathBuf,
    pub port: u16,
    pub ytdlp_bin: String,
    pub work_dir: PathBuf,
    pub extraction_timeout: Duration,
}

impl Config {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let api_id = parse(&require("API_ID")?, "API_ID")?;
        let api_hash = require("API_HASH")?;
        let bot_token = require("BOT_TOKEN")?;

        let port = match get("PORT") {
            Some(value) => parse(&value, "PORT")?,
            None => DEFAULT_PORT,
        };
        let extraction_timeout = match get("EXTRACTION_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse(&value, "EXTRACTION_TIMEOUT_SECS")?),
            None => Duration::from_secs(DEFAULT_EXTRACTION_TIMEOUT_SECS),
        };

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_file: get("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            port,
            ytdlp_bin: get("YTDLP_BIN").unwrap_or_else(|| DEFAULT_YTDLP_BIN.to_string()),
            work_dir: get("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("tiktok-downloads")),
            extraction_timeout,
        })
    }
}

fn parse<T: std::str::FromStr>(value: &str, name: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
