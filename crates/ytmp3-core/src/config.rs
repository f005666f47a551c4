//! Configuration management for ytmp3

use crate::downloader::{MAX_VBR_LEVEL, MIN_BITRATE_KBPS};
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub output: OutputConfig,
    pub cover: CoverConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to yt-dlp binary (auto-detected if not set)
    pub yt_dlp: Option<PathBuf>,
    /// Path to FFmpeg binary (auto-detected if not set)
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the MP3 files land in
    pub directory: PathBuf,
    /// Rename each file to its sanitized track title after download
    pub rename_to_title: bool,
    /// yt-dlp audio quality: VBR level 0-10 or a bitrate in kbps
    pub audio_quality: String,
    /// yt-dlp output template, relative to `directory`
    pub filename_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Embed the video thumbnail as front cover
    pub enabled: bool,
    /// Thumbnail download timeout in seconds
    pub timeout_secs: u64,
    /// JPEG quality used when converting WebP thumbnails
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            output: OutputConfig {
                directory: PathBuf::from("downloaded_music"),
                rename_to_title: false,
                audio_quality: "192".to_string(),
                filename_template: "%(title)s.%(ext)s".to_string(),
            },
            cover: CoverConfig {
                enabled: true,
                timeout_secs: 15,
                jpeg_quality: 90,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(default_config) = Self::default_config_file() {
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("YTMP3_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/ytmp3/config.toml`
    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ytmp3/config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cover.jpeg_quality == 0 || self.cover.jpeg_quality > 100 {
            return Err(ConfigError::InvalidValue(format!(
                "cover.jpeg_quality must be within 1..=100, got {}",
                self.cover.jpeg_quality
            )));
        }
        match self.output.audio_quality.trim().parse::<u32>() {
            Ok(q) if q <= MAX_VBR_LEVEL || q >= MIN_BITRATE_KBPS => {}
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "output.audio_quality must be a VBR level 0-{} or a bitrate of at least {} kbps, got {:?}",
                    MAX_VBR_LEVEL, MIN_BITRATE_KBPS, self.output.audio_quality
                )));
            }
        }
        Ok(())
    }

    /// Get yt-dlp path, auto-detecting if not configured
    pub fn yt_dlp_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.yt_dlp {
            Ok(path.clone())
        } else {
            which::which("yt-dlp")
                .map_err(|_| ConfigError::InvalidValue("yt-dlp not found in PATH".to_string()))
        }
    }

    /// Get FFmpeg path, auto-detecting if not configured
    pub fn ffmpeg_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.ffmpeg {
            Ok(path.clone())
        } else {
            which::which("ffmpeg")
                .map_err(|_| ConfigError::InvalidValue("ffmpeg not found in PATH".to_string()))
        }
    }

    pub fn cover_timeout(&self) -> Duration {
        Duration::from_secs(self.cover.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.output.directory, PathBuf::from("downloaded_music"));
        assert!(!config.output.rename_to_title);
        assert_eq!(config.output.audio_quality, "192");
        assert!(config.cover.enabled);
        assert_eq!(config.cover_timeout(), Duration::from_secs(15));
        assert_eq!(config.cover.jpeg_quality, 90);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[output]\ndirectory = \"music\"\nrename_to_title = true\n\n[cover]\njpeg_quality = 75\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.output.directory, PathBuf::from("music"));
        assert!(config.output.rename_to_title);
        assert_eq!(config.cover.jpeg_quality, 75);
        // untouched keys keep their defaults
        assert_eq!(config.cover.timeout_secs, 15);
    }

    #[test]
    fn rejects_out_of_range_jpeg_quality() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cover]\njpeg_quality = 0\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn audio_quality_accepts_vbr_levels_and_bitrates_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        for ok in ["0", "5", "10", "32", "320"] {
            std::fs::write(&path, format!("[output]\naudio_quality = \"{}\"\n", ok)).unwrap();
            assert!(Config::load(Some(&path)).is_ok(), "{} should be accepted", ok);
        }
        for bad in ["11", "31", "fast", ""] {
            std::fs::write(&path, format!("[output]\naudio_quality = \"{}\"\n", bad)).unwrap();
            assert!(
                matches!(Config::load(Some(&path)), Err(ConfigError::InvalidValue(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn configured_tool_paths_skip_detection() {
        let mut config = Config::default();
        config.paths.yt_dlp = Some(PathBuf::from("/opt/bin/yt-dlp"));
        config.paths.ffmpeg = Some(PathBuf::from("/opt/bin/ffmpeg"));
        assert_eq!(config.yt_dlp_path().unwrap(), PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(config.ffmpeg_path().unwrap(), PathBuf::from("/opt/bin/ffmpeg"));
    }
}
