//! Sequential batch driver

use crate::error::{Ytmp3Error, Result};
use crate::pipeline::{Pipeline, PipelineStage, TrackOutcome};
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: Vec<TrackOutcome>,
    pub failed: Vec<(String, Ytmp3Error)>,
}

impl BatchReport {
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty()
    }
}

pub struct Batch {
    pipeline: Pipeline,
}

impl Batch {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Process every URL in order. A failing URL is logged and skipped;
    /// only failing to create the output directory aborts the run.
    pub async fn run(&self, urls: &[String]) -> Result<BatchReport> {
        let output_dir = &self.pipeline.config().output_dir;
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir).map_err(|source| Ytmp3Error::OutputDir {
                path: output_dir.clone(),
                source,
            })?;
            info!("Created output directory: {}", output_dir.display());
        }

        let total = urls.len();
        info!("Starting download process for {} URL(s)", total);
        info!(
            "Output directory: {}",
            std::fs::canonicalize(output_dir)
                .unwrap_or_else(|_| output_dir.clone())
                .display()
        );

        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        for (i, url) in urls.iter().enumerate() {
            info!("[{}/{}] Processing URL: {}", i + 1, total, url);
            self.pipeline
                .report(PipelineStage::Started {
                    index: i + 1,
                    total,
                    url: url.clone(),
                })
                .await;

            match self.pipeline.run(url).await {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(e) => {
                    error!("Error while processing {}: {}", url, e);
                    report.failed.push((url.clone(), e));
                }
            }
        }

        if report.all_failed() {
            info!("No items were successfully downloaded or processed");
        } else {
            info!(
                "Successfully downloaded and processed {} out of {} item(s)",
                report.succeeded.len(),
                total
            );
        }

        Ok(report)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::downloader::DownloadOptions;
    use crate::pipeline::PipelineConfig;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    /// Fails for URLs containing "fail"; otherwise writes `<last path segment>.mp3`
    /// next to the `-o` template and prints the info JSON. A `thumbnail` file
    /// beside the script supplies the thumbnail URL.
    const FAKE_YT_DLP: &str = r#"#!/bin/sh
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then tmpl="$a"; fi
  prev="$a"
  url="$a"
done
case "$url" in
  *fail*) echo "ERROR: [youtube] x: Video unavailable" >&2; exit 1;;
  *nomp3*) echo '{"id": "n", "title": "No mp3", "filepath": "/nonexistent/x.m4a"}'; exit 0;;
esac
dir=$(dirname "$tmpl")
name=$(basename "$url")
extra=""
if [ -f "$(dirname "$0")/thumbnail" ]; then
  extra=", \"thumbnail\": \"$(cat "$(dirname "$0")/thumbnail")\""
fi
printf 'ID3' > "$dir/$name.mp3"
printf '{"id": "%s", "title": "Song %s", "uploader": "Uploader", "filepath": "%s"%s}\n' "$name" "$name" "$dir/$name.mp3" "$extra"
"#;

    /// Copies the first `-i` input to the last argument.
    const FAKE_FFMPEG: &str = r#"#!/bin/sh
in=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-i" ] && [ -z "$in" ]; then in="$a"; fi
  prev="$a"
  out="$a"
done
cp "$in" "$out"
"#;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn pipeline_config(tools: &Path, output_dir: PathBuf) -> PipelineConfig {
        PipelineConfig {
            output_dir,
            rename_to_title: false,
            embed_cover: false,
            cover_timeout: Duration::from_secs(1),
            jpeg_quality: 90,
            download: DownloadOptions {
                audio_quality: "192".to_string(),
                filename_template: "%(title)s.%(ext)s".to_string(),
            },
            yt_dlp_path: script(tools, "yt-dlp", FAKE_YT_DLP),
            ffmpeg_path: script(tools, "ffmpeg", FAKE_FFMPEG),
        }
    }

    fn batch(tools: &Path, output_dir: PathBuf) -> Batch {
        Batch::new(Pipeline::new(pipeline_config(tools, output_dir), None).unwrap())
    }

    #[tokio::test]
    async fn failed_downloads_do_not_abort_the_batch() {
        let tools = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let batch = batch(tools.path(), out.path().join("music"));

        let urls = vec![
            "https://example.com/one".to_string(),
            "https://example.com/fail".to_string(),
            "https://example.com/nomp3".to_string(),
            "https://example.com/two".to_string(),
        ];
        let report = batch.run(&urls).await.unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, "https://example.com/fail");
        assert!(matches!(
            report.failed[0].1,
            Ytmp3Error::Download(crate::error::DownloadError::VideoUnavailable(_))
        ));
        assert!(matches!(
            report.failed[1].1,
            Ytmp3Error::Download(crate::error::DownloadError::Mp3NotFound { .. })
        ));

        let first = &report.succeeded[0];
        assert_eq!(first.path, out.path().join("music").join("one.mp3"));
        assert!(first.path.exists());
        assert!(first.tagged);
        assert!(!first.cover_embedded);
        assert_eq!(first.tags.title, "Song one");
        assert_eq!(first.tags.artist, "Uploader");
        assert_eq!(report.succeeded[1].url, "https://example.com/two");
    }

    #[tokio::test]
    async fn all_failures_still_return_a_report() {
        let tools = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let batch = batch(tools.path(), out.path().to_path_buf());

        let report = batch
            .run(&["https://example.com/fail".to_string()])
            .await
            .unwrap();
        assert!(report.all_failed());
        assert_eq!(report.failed.len(), 1);
    }

    #[tokio::test]
    async fn uncreatable_output_dir_aborts() {
        let tools = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let blocker = out.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let batch = batch(tools.path(), blocker.join("music"));

        let err = batch
            .run(&["https://example.com/one".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Ytmp3Error::OutputDir { .. }));
    }

    #[tokio::test]
    async fn renames_then_tags_with_fetched_cover() {
        use image::{DynamicImage, ImageFormat, RgbImage};
        use std::io::Cursor;

        let mut webp = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut webp, ImageFormat::WebP)
            .unwrap();

        let mut server = mockito::Server::new_async().await;
        let thumb = server
            .mock("GET", "/vi/one/maxresdefault.webp")
            .with_status(200)
            .with_header("content-type", "image/webp")
            .with_body(webp.into_inner())
            .create_async()
            .await;

        let tools = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(
            tools.path().join("thumbnail"),
            format!("{}/vi/one/maxresdefault.webp", server.url()),
        )
        .unwrap();

        let mut config = pipeline_config(tools.path(), out.path().to_path_buf());
        config.rename_to_title = true;
        config.embed_cover = true;
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let batch = Batch::new(Pipeline::new(config, Some(tx)).unwrap());

        let report = batch
            .run(&["https://example.com/one".to_string()])
            .await
            .unwrap();
        drop(batch);

        thumb.assert_async().await;
        assert_eq!(report.succeeded.len(), 1);
        let outcome = &report.succeeded[0];
        assert_eq!(outcome.path, out.path().join("Song_one.mp3"));
        assert!(outcome.path.exists());
        assert!(!out.path().join("one.mp3").exists());
        assert!(outcome.tagged);
        assert!(outcome.cover_embedded);

        let mut stages = Vec::new();
        while let Some(stage) = rx.recv().await {
            stages.push(stage);
        }
        let position = |want: fn(&PipelineStage) -> bool| stages.iter().position(want).unwrap();
        let renamed = position(|s| matches!(s, PipelineStage::Renaming { .. }));
        let fetching = position(|s| matches!(s, PipelineStage::FetchingCover { .. }));
        let tagging = position(|s| matches!(s, PipelineStage::Tagging { .. }));
        let complete = position(|s| matches!(s, PipelineStage::Complete { .. }));
        assert!(renamed < fetching && fetching < tagging && tagging < complete);
    }
}
