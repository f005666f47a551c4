//! Audio download and MP3 extraction using yt-dlp

use crate::error::DownloadError;
use regex::Regex;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// VBR level 0-10 or a bitrate in kbps
    pub audio_quality: String,
    /// Output template relative to the output directory
    pub filename_template: String,
}

#[derive(Debug)]
pub struct Downloader {
    yt_dlp_path: PathBuf,
    ffmpeg_path: PathBuf,
    options: DownloadOptions,
}

/// Subset of the info dict yt-dlp prints once the file has been moved into place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub filepath: Option<PathBuf>,
    #[serde(default)]
    pub requested_downloads: Option<Vec<RequestedDownload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestedDownload {
    #[serde(default)]
    pub filepath: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DownloadResult {
    pub mp3_path: PathBuf,
    pub info: VideoInfo,
}

impl VideoInfo {
    /// Final MP3 path: `filepath` when it already points at the MP3, otherwise
    /// the first requested download that does.
    pub fn mp3_candidate(&self) -> Option<PathBuf> {
        if let Some(path) = self.filepath.as_ref().filter(|p| is_mp3(p)) {
            return Some(path.clone());
        }

        self.requested_downloads
            .iter()
            .flatten()
            .filter_map(|d| d.filepath.as_ref())
            .find(|p| is_mp3(p))
            .cloned()
    }
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
}

impl Downloader {
    pub fn new(yt_dlp_path: PathBuf, ffmpeg_path: PathBuf, options: DownloadOptions) -> Self {
        Self {
            yt_dlp_path,
            ffmpeg_path,
            options,
        }
    }

    /// Download a single video's audio as MP3 into `output_dir`
    pub async fn download(&self, url: &str, output_dir: &Path) -> Result<DownloadResult, DownloadError> {
        info!("Starting download and extraction: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(self.build_args(url, output_dir))
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DownloadError::YtDlpNotFound,
                _ => DownloadError::Io(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("yt-dlp stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            return Err(classify_failure(url, output.status.code(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_info(&stdout).ok_or_else(|| DownloadError::NoInfo(url.to_string()))??;

        let mp3_path = locate_mp3(&info)?;
        info!(
            "Download and conversion successful. Final file: '{}'",
            mp3_path.file_name().unwrap_or_default().to_string_lossy()
        );

        Ok(DownloadResult { mp3_path, info })
    }

    fn build_args(&self, url: &str, output_dir: &Path) -> Vec<OsString> {
        let template = output_dir.join(&self.options.filename_template);
        let quality = audio_quality_arg(&self.options.audio_quality);

        let mut args: Vec<OsString> = [
            "-f",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            quality.as_str(),
            "--no-playlist",
            "--no-simulate",
            // Info dict after post-processing, so `filepath` names the MP3
            "--print",
            "after_move:%()j",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push("--ffmpeg-location".into());
        args.push(self.ffmpeg_path.clone().into_os_string());
        args.push("-o".into());
        args.push(template.into_os_string());
        args.push("--".into());
        args.push(url.into());
        args
    }
}

/// `0`..=`10` is a VBR level and passes through; anything else is a bitrate in kbps.
pub fn audio_quality_arg(quality: &str) -> String {
    let quality = quality.trim();
    match quality.parse::<u32>() {
        Ok(level) if level <= MAX_VBR_LEVEL => level.to_string(),
        _ => format!("{}K", quality),
    }
}

pub const MAX_VBR_LEVEL: u32 = 10;
pub const MIN_BITRATE_KBPS: u32 = 32;

/// Last JSON object printed on stdout, if any.
fn parse_info(stdout: &str) -> Option<Result<VideoInfo, DownloadError>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .last()
        .map(|line| {
            serde_json::from_str(line).map_err(|e| DownloadError::MetadataParse(e.to_string()))
        })
}

fn locate_mp3(info: &VideoInfo) -> Result<PathBuf, DownloadError> {
    match info.mp3_candidate() {
        Some(path) if path.exists() => Ok(path),
        candidate => {
            let last_known = candidate.or_else(|| info.filepath.clone());
            if let Some(ref p) = last_known {
                debug!("Last known path: '{}', exists: {}", p.display(), p.exists());
            }
            Err(DownloadError::Mp3NotFound { last_known })
        }
    }
}

fn error_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^ERROR:\s*(?:\[[^\]]*\]\s*)?(.+)$").expect("valid regex"))
}

fn classify_failure(url: &str, code: Option<i32>, stderr: &str) -> DownloadError {
    if stderr.contains("Video unavailable") || stderr.contains("Private video") {
        return DownloadError::VideoUnavailable(url.to_string());
    }
    if stderr.contains("is not a valid URL") || stderr.contains("Unsupported URL") {
        return DownloadError::InvalidUrl(url.to_string());
    }

    let message = error_line_regex()
        .captures_iter(stderr)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| "no error message".to_string());

    DownloadError::YtDlpFailed { code, message }
}
