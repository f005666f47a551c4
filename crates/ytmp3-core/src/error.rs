//! Error types for ytmp3-core

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Ytmp3Error>;

#[derive(Error, Debug)]
pub enum Ytmp3Error {
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Cover art failed: {0}")]
    Cover(#[from] CoverError),

    #[error("Metadata embedding failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum UrlListError {
    #[error("URL file not found: {0}")]
    NotFound(PathBuf),

    #[error("URL file {0} is empty or contains only blank lines")]
    Empty(PathBuf),

    #[error("Failed to read URL file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("yt-dlp not found. Install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("yt-dlp failed with exit code {code:?}: {message}")]
    YtDlpFailed { code: Option<i32>, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Video unavailable or private: {0}")]
    VideoUnavailable(String),

    #[error("yt-dlp returned no information for {0}")]
    NoInfo(String),

    #[error("Could not locate the final MP3 file (last known path: {last_known:?})")]
    Mp3NotFound { last_known: Option<PathBuf> },

    #[error("Failed to parse yt-dlp output: {0}")]
    MetadataParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CoverError {
    #[error("Thumbnail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Thumbnail server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("Image conversion failed: {0}")]
    Convert(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("FFmpeg not found. Install with: apt install ffmpeg")]
    FfmpegNotFound,

    #[error("FFmpeg metadata embedding failed with exit code {code:?}: {message}")]
    FfmpegFailed { code: Option<i32>, message: String },

    #[error("MP3 file not found: {0}")]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}
