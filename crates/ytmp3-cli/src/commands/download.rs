use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::args::DownloadArgs;
use ytmp3_core::{
    batch::Batch,
    config::Config,
    pipeline::{Pipeline, PipelineConfig, PipelineStage},
    url_list::read_url_list,
};

pub async fn run(url_list: &Path, options: &DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(ref dir) = options.output {
        config.output.directory = dir.clone();
    }
    config.output.rename_to_title |= options.rename;
    config.cover.enabled &= !options.no_cover;

    let urls = read_url_list(url_list)?;
    debug!("Read {} URL(s) from {}", urls.len(), url_list.display());
    let pipeline_config =
        PipelineConfig::from_config(&config).context("Required tools are missing (try `ytmp3 doctor`)")?;

    let (tx, mut rx) = mpsc::channel(32);

    let spinner_style = ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")?
        .tick_chars("=>-");

    let progress_handle = tokio::spawn(async move {
        let mut pb = ProgressBar::hidden();
        let mut prefix = String::new();

        while let Some(stage) = rx.recv().await {
            match stage {
                PipelineStage::Started { index, total, url } => {
                    pb = ProgressBar::new_spinner();
                    pb.set_style(spinner_style.clone());
                    pb.enable_steady_tick(Duration::from_millis(100));
                    prefix = format!("[{}/{}]", index, total);
                    pb.set_message(format!("{} {}", prefix, truncate(&url, 50)));
                }
                PipelineStage::Downloading { .. } => {
                    pb.set_message(format!("{} Downloading and converting...", prefix));
                }
                PipelineStage::Located { path } => {
                    pb.set_message(format!("{} Downloaded {}", prefix, file_name(&path)));
                }
                PipelineStage::Renaming { to } => {
                    pb.set_message(format!("{} Renamed to {}", prefix, file_name(&to)));
                }
                PipelineStage::FetchingCover { .. } => {
                    pb.set_message(format!("{} Fetching cover art...", prefix));
                }
                PipelineStage::Tagging { title, artist } => {
                    pb.set_message(format!(
                        "{} Tagging: {} - {}",
                        prefix,
                        truncate(&artist, 30),
                        truncate(&title, 40)
                    ));
                }
                PipelineStage::Complete { output, duration } => {
                    pb.finish_with_message(format!(
                        "{} Done: {} ({:.1}s)",
                        prefix,
                        file_name(&output),
                        duration.as_secs_f32()
                    ));
                }
                PipelineStage::Failed { stage, error } => {
                    pb.abandon_with_message(format!("{} Failed at {}: {}", prefix, stage, error));
                }
            }
        }
    });

    let batch = Batch::new(Pipeline::new(pipeline_config, Some(tx))?);
    let result = batch.run(&urls).await;

    // Closes the progress channel
    drop(batch);
    progress_handle.await?;

    let report = result?;

    println!("\n=== Download Process Finished ===");
    println!("Succeeded: {}", report.succeeded.len());
    println!("Failed: {}", report.failed.len());

    let untagged: Vec<_> = report.succeeded.iter().filter(|o| !o.tagged).collect();
    if !untagged.is_empty() {
        println!("\nDownloaded without tags:");
        for outcome in untagged {
            println!("  {}", outcome.path.display());
        }
    }

    if !report.failed.is_empty() {
        println!("\nFailed URLs:");
        for (url, e) in &report.failed {
            println!("  {} - {}", url, e);
        }
    }

    let output_dir = &config.output.directory;
    println!(
        "\nFiles are located in: {}",
        std::fs::canonicalize(output_dir)
            .unwrap_or_else(|_| output_dir.clone())
            .display()
    );

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
