use anyhow::{Context, Result};
use std::path::Path;
use ytmp3_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("ytmp3 configuration\n");
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered.trim_end());

    if config.paths.yt_dlp.is_none() || config.paths.ffmpeg.is_none() {
        println!("\n# unset tool paths are looked up in PATH");
    }

    println!("\nConfig file locations (in priority order):");
    if let Some(p) = config_path {
        println!("  1. {} (specified)", p.display());
    }
    if let Some(default) = Config::default_config_file() {
        println!("  2. {}", default.display());
    }
    println!("  3. Environment variables (YTMP3_<SECTION>__<KEY>, e.g. YTMP3_OUTPUT__DIRECTORY)");

    Ok(())
}
