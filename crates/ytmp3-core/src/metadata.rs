//! Title/artist tags and cover art embedding using FFmpeg

use crate::cover::CoverImage;
use crate::downloader::VideoInfo;
use crate::error::MetadataError;
use std::ffi::OsString;
use std::io::Write;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
}

impl TrackTags {
    /// Title from `track` then `title`; artist from `artist` then `uploader`.
    pub fn from_info(info: &VideoInfo) -> Self {
        Self {
            title: pick(&[&info.track, &info.title], UNKNOWN_TITLE),
            artist: pick(&[&info.artist, &info.uploader], UNKNOWN_ARTIST),
        }
    }
}

fn pick(candidates: &[&Option<String>], fallback: &str) -> String {
    let value = candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|s| !s.is_empty())
        .map(str::trim)
        .unwrap_or_default();

    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug)]
pub struct MetadataEmbedder {
    ffmpeg_path: PathBuf,
}

impl MetadataEmbedder {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    /// Write tags, and the cover if given, into `mp3` in place.
    ///
    /// Returns whether the cover made it into the file: when the remux with
    /// the cover fails, the tags are written on their own.
    pub async fn embed(
        &self,
        mp3: &Path,
        tags: &TrackTags,
        cover: Option<&CoverImage>,
    ) -> Result<bool, MetadataError> {
        if !mp3.exists() {
            return Err(MetadataError::MissingFile(mp3.to_path_buf()));
        }

        if let Some(cover) = cover {
            match self.embed_with_cover(mp3, tags, cover).await {
                Ok(()) => {
                    info!(
                        "Embedded cover art (mime: {}) into '{}'",
                        cover.mime,
                        display_name(mp3)
                    );
                    return Ok(true);
                }
                Err(e) => warn!("Could not embed cover art for '{}': {}", display_name(mp3), e),
            }
        }

        self.remux(mp3, |dest| tag_args(mp3, None, dest, tags)).await?;
        info!(
            "Set metadata: title='{}', artist='{}' for '{}'",
            tags.title,
            tags.artist,
            display_name(mp3)
        );
        Ok(false)
    }

    async fn embed_with_cover(
        &self,
        mp3: &Path,
        tags: &TrackTags,
        cover: &CoverImage,
    ) -> Result<(), MetadataError> {
        let mut art = tempfile::Builder::new()
            .prefix("ytmp3-cover-")
            .suffix(&format!(".{}", cover.extension()))
            .tempfile()?;
        art.write_all(&cover.data)?;
        art.flush()?;

        self.remux(mp3, |dest| tag_args(mp3, Some(art.path()), dest, tags))
            .await?;
        info!(
            "Set metadata: title='{}', artist='{}' for '{}'",
            tags.title,
            tags.artist,
            display_name(mp3)
        );
        Ok(())
    }

    /// Run ffmpeg into a sibling temp file, then move it over `mp3`.
    async fn remux<F>(&self, mp3: &Path, args: F) -> Result<(), MetadataError>
    where
        F: FnOnce(&Path) -> Vec<OsString>,
    {
        let dir = mp3.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let staged = tempfile::Builder::new()
            .prefix(".ytmp3-")
            .suffix(".mp3")
            .tempfile_in(dir)?;

        let output = Command::new(&self.ffmpeg_path)
            .args(args(staged.path()))
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MetadataError::FfmpegNotFound,
                _ => MetadataError::Io(e),
            })?;

        if !output.status.success() {
            return Err(MetadataError::FfmpegFailed {
                code: output.status.code(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        staged.persist(mp3).map_err(|e| MetadataError::Io(e.error))?;
        debug!("Rewrote tags in: {}", mp3.display());
        Ok(())
    }
}

fn tag_args(input: &Path, cover: Option<&Path>, output: &Path, tags: &TrackTags) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
    args.push("-i".into());
    args.push(input.into());

    if let Some(art) = cover {
        args.push("-i".into());
        args.push(art.into());
        // Only the new picture survives; earlier attached pictures are dropped
        for a in ["-map", "0:a", "-map", "1:v"] {
            args.push(a.into());
        }
    } else {
        for a in ["-map", "0"] {
            args.push(a.into());
        }
    }

    for a in ["-c", "copy", "-id3v2_version", "3"] {
        args.push(a.into());
    }
    args.push("-metadata".into());
    args.push(format!("title={}", tags.title).into());
    args.push("-metadata".into());
    args.push(format!("artist={}", tags.artist).into());

    if cover.is_some() {
        for a in [
            "-metadata:s:v",
            "title=Cover",
            "-metadata:s:v",
            "comment=Cover (front)",
            "-disposition:v",
            "attached_pic",
        ] {
            args.push(a.into());
        }
    }

    for a in ["-f", "mp3", "-y"] {
        args.push(a.into());
    }
    args.push(output.into());
    args
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

const ACCENT_CHARS: &str =
    "ÂÃÄÀÁÅÆÇÈÉÊËÌÍÎÏÐÑÒÓÔÕÖŐØŒÙÚÛÜŰÝÞßàáâãäåæçèéêëìíîïðñòóôõöőøœùúûüűýþÿ";
const ACCENT_REPLACEMENTS: [&str; 68] = [
    "A", "A", "A", "A", "A", "A", "AE", "C", "E", "E", "E", "E", "I", "I", "I", "I", "D", "N",
    "O", "O", "O", "O", "O", "O", "O", "OE", "U", "U", "U", "U", "U", "Y", "TH", "ss", "a", "a",
    "a", "a", "a", "a", "ae", "c", "e", "e", "e", "e", "i", "i", "i", "i", "o", "n", "o", "o",
    "o", "o", "o", "o", "o", "oe", "u", "u", "u", "u", "u", "y", "th", "y",
];

fn unaccent(c: char) -> Option<&'static str> {
    ACCENT_CHARS
        .chars()
        .zip(ACCENT_REPLACEMENTS)
        .find(|(from, _)| *from == c)
        .map(|(_, to)| to)
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(?::[0-9]+)+").expect("valid regex"))
}

/// Sanitize a title for use as a file name.
///
/// `restricted` follows yt-dlp's restricted file names: ASCII only with
/// accents folded, no spaces or shell metacharacters, `:` becomes `_-`.
pub fn sanitize_filename(name: &str, restricted: bool) -> String {
    let cleaned = if restricted {
        sanitize_restricted(name)
    } else {
        name.chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                _ => c,
            })
            .collect::<String>()
            .trim()
            .to_string()
    };

    // Leading dots would hide the file
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

fn sanitize_restricted(name: &str) -> String {
    // 12:30:00 -> 12_30_00 rather than 12_-30_-00
    let name = timestamp_regex().replace_all(name, |caps: &regex::Captures| caps[0].replace(':', "_"));

    let mut result = String::with_capacity(name.len());
    for c in name.chars() {
        if let Some(plain) = unaccent(c) {
            result.push_str(plain);
            continue;
        }
        match c {
            '?' | '"' => {}
            c if c.is_control() => {}
            ':' => result.push_str("_-"),
            '\\' | '/' | '|' | '*' | '<' | '>' => result.push('_'),
            '!' | '&' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | '$' | ';' | '`' | '^' | ',' | '#' => {
                result.push('_')
            }
            c if c.is_whitespace() || !c.is_ascii() => result.push('_'),
            c => result.push(c),
        }
    }

    while result.contains("__") {
        result = result.replace("__", "_");
    }
    let mut result = result.trim_matches('_');
    // "Foreign band name - English song title"
    if let Some(rest) = result.strip_prefix("-_") {
        result = rest;
    }
    match result.strip_prefix('-') {
        Some(rest) => format!("_{}", rest),
        None => result.to_string(),
    }
}
