use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use ytmp3_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("ytmp3 dependency check\n");

    let mut all_ok = true;

    print!("yt-dlp:  ");
    all_ok &= report(
        config.yt_dlp_path().ok(),
        "--version",
        |out| out.trim().to_string(),
        "pip install yt-dlp",
    );

    print!("ffmpeg:  ");
    all_ok &= report(
        config.ffmpeg_path().ok(),
        "-version",
        // "ffmpeg version 6.1.1 Copyright ..." -> "6.1.1"
        |out| {
            out.lines()
                .next()
                .and_then(|l| l.split_whitespace().nth(2))
                .unwrap_or("unknown")
                .to_string()
        },
        "apt install ffmpeg (or brew install ffmpeg)",
    );

    println!();
    if all_ok {
        println!("All dependencies OK!");
        Ok(())
    } else {
        bail!("Some dependencies are missing. See above for installation instructions.")
    }
}

fn report(path: Option<PathBuf>, version_flag: &str, version: impl Fn(&str) -> String, hint: &str) -> bool {
    let Some(path) = path else {
        println!("NOT FOUND");
        println!("         Install with: {}", hint);
        return false;
    };

    match Command::new(&path).arg(version_flag).output() {
        Ok(out) if out.status.success() => {
            let v = version(&String::from_utf8_lossy(&out.stdout));
            println!("OK ({}, {})", v, path.display());
            true
        }
        _ => {
            println!("FOUND at {} but failed to get version", path.display());
            false
        }
    }
}
