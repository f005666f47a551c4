use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ytmp3")]
#[command(author, version, about = "Batch-download video audio as tagged MP3 files")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Text file with one URL per line
    ///
    /// A file literally named `doctor` or `config` is read as that subcommand;
    /// pass it with a path prefix instead, e.g. `./doctor`.
    #[arg(value_name = "URL_LIST_FILE")]
    pub url_list: Option<PathBuf>,

    #[command(flatten)]
    pub options: DownloadArgs,

    /// Log level
    #[arg(long, value_enum, default_value = "info", ignore_case = true, global = true)]
    pub loglevel: LogLevel,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that yt-dlp and ffmpeg are available
    Doctor,

    /// Show the effective configuration
    Config,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct DownloadArgs {
    /// Output directory (default: downloaded_music)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rename files to their sanitized track title
    #[arg(long)]
    pub rename: bool,

    /// Do not embed the thumbnail as cover art
    #[arg(long)]
    pub no_cover: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[value(alias = "warning")]
    Warn,
    #[value(alias = "critical")]
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
