//! Per-URL processing: download, locate, rename, tag, embed cover

use crate::config::Config;
use crate::cover::{CoverFetcher, CoverImage};
use crate::downloader::{DownloadOptions, Downloader};
use crate::error::{DownloadError, Ytmp3Error};
use crate::metadata::{MetadataEmbedder, TrackTags};
use crate::rename::rename_to_title;

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub rename_to_title: bool,
    pub embed_cover: bool,
    pub cover_timeout: Duration,
    pub jpeg_quality: u8,
    pub download: DownloadOptions,
    pub yt_dlp_path: PathBuf,
    pub ffmpeg_path: PathBuf,
}

impl PipelineConfig {
    /// Resolve tool paths and settings from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, Ytmp3Error> {
        let yt_dlp_path = config
            .yt_dlp_path()
            .map_err(|_| DownloadError::YtDlpNotFound)?;
        let ffmpeg_path = config
            .ffmpeg_path()
            .map_err(|_| crate::error::MetadataError::FfmpegNotFound)?;

        Ok(Self {
            output_dir: config.output.directory.clone(),
            rename_to_title: config.output.rename_to_title,
            embed_cover: config.cover.enabled,
            cover_timeout: config.cover_timeout(),
            jpeg_quality: config.cover.jpeg_quality,
            download: DownloadOptions {
                audio_quality: config.output.audio_quality.clone(),
                filename_template: config.output.filename_template.clone(),
            },
            yt_dlp_path,
            ffmpeg_path,
        })
    }
}

/// Pipeline progress stages
#[derive(Debug, Clone)]
pub enum PipelineStage {
    Started { index: usize, total: usize, url: String },
    Downloading { url: String },
    Located { path: PathBuf },
    Renaming { to: PathBuf },
    FetchingCover { url: String },
    Tagging { title: String, artist: String },
    Complete { output: PathBuf, duration: Duration },
    Failed { stage: String, error: String },
}

/// What happened to one URL that produced an MP3
#[derive(Debug, Clone)]
pub struct TrackOutcome {
    pub url: String,
    pub path: PathBuf,
    pub tags: TrackTags,
    pub tagged: bool,
    pub cover_embedded: bool,
}

pub struct Pipeline {
    config: PipelineConfig,
    downloader: Downloader,
    embedder: MetadataEmbedder,
    cover_fetcher: Option<CoverFetcher>,
    progress_tx: Option<mpsc::Sender<PipelineStage>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        progress_tx: Option<mpsc::Sender<PipelineStage>>,
    ) -> Result<Self, Ytmp3Error> {
        let downloader = Downloader::new(
            config.yt_dlp_path.clone(),
            config.ffmpeg_path.clone(),
            config.download.clone(),
        );
        let embedder = MetadataEmbedder::new(config.ffmpeg_path.clone());
        let cover_fetcher = if config.embed_cover {
            Some(CoverFetcher::new(config.cover_timeout)?)
        } else {
            None
        };

        Ok(Self {
            config,
            downloader,
            embedder,
            cover_fetcher,
            progress_tx,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub(crate) async fn report(&self, stage: PipelineStage) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(stage).await;
        }
    }

    /// Process one URL. Succeeds once the MP3 exists; tagging and cover
    /// problems are logged and recorded in the outcome.
    pub async fn run(&self, url: &str) -> Result<TrackOutcome, Ytmp3Error> {
        let start_time = Instant::now();

        self.report(PipelineStage::Downloading { url: url.to_string() })
            .await;

        let download = match self.downloader.download(url, &self.config.output_dir).await {
            Ok(d) => d,
            Err(e) => {
                self.report(PipelineStage::Failed {
                    stage: "download".to_string(),
                    error: e.to_string(),
                })
                .await;
                return Err(e.into());
            }
        };

        self.report(PipelineStage::Located {
            path: download.mp3_path.clone(),
        })
        .await;

        let tags = TrackTags::from_info(&download.info);

        let path = if self.config.rename_to_title {
            let renamed = rename_to_title(&download.mp3_path, &tags.title);
            if renamed != download.mp3_path {
                self.report(PipelineStage::Renaming { to: renamed.clone() })
                    .await;
            }
            renamed
        } else {
            debug!(
                "Skipping custom renaming. Using filename from yt-dlp: '{}'",
                download.mp3_path.display()
            );
            download.mp3_path.clone()
        };

        let cover = match (&self.cover_fetcher, download.info.thumbnail.as_deref()) {
            (Some(fetcher), Some(thumb)) if !thumb.is_empty() => {
                self.report(PipelineStage::FetchingCover {
                    url: thumb.to_string(),
                })
                .await;
                self.fetch_cover(fetcher, thumb).await
            }
            _ => None,
        };

        self.report(PipelineStage::Tagging {
            title: tags.title.clone(),
            artist: tags.artist.clone(),
        })
        .await;

        let (tagged, cover_embedded) = match self.embedder.embed(&path, &tags, cover.as_ref()).await {
            Ok(cover_embedded) => (true, cover_embedded),
            Err(e) => {
                warn!("Failed to set metadata for '{}': {}", path.display(), e);
                (false, false)
            }
        };

        let duration = start_time.elapsed();
        info!("Finished {} ({:.1}s)", path.display(), duration.as_secs_f32());

        self.report(PipelineStage::Complete {
            output: path.clone(),
            duration,
        })
        .await;

        Ok(TrackOutcome {
            url: url.to_string(),
            path,
            tags,
            tagged,
            cover_embedded,
        })
    }

    async fn fetch_cover(&self, fetcher: &CoverFetcher, url: &str) -> Option<CoverImage> {
        match fetcher.fetch(url).await {
            Ok(image) => Some(image.into_embeddable(self.config.jpeg_quality)),
            Err(e) => {
                warn!("Could not download thumbnail from {}: {}", url, e);
                None
            }
        }
    }
}
