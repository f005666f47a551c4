//! Thumbnail download and conversion to an embeddable cover image

use crate::error::CoverError;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime: String,
}

impl CoverImage {
    pub fn new(data: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            data,
            mime: mime.into(),
        }
    }

    pub fn is_webp(&self) -> bool {
        self.mime == "image/webp"
            || matches!(image::guess_format(&self.data), Ok(ImageFormat::WebP))
    }

    /// File extension ffmpeg can probe the image from
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }

    /// Convert WebP to JPEG, leaving other formats as they are. A failed
    /// conversion keeps the original WebP bytes.
    pub fn into_embeddable(self, jpeg_quality: u8) -> Self {
        if !self.is_webp() {
            return self;
        }

        info!("Converting WebP thumbnail to JPEG");
        match webp_to_jpeg(&self.data, jpeg_quality) {
            Ok(data) => {
                info!("WebP successfully converted to JPEG");
                Self::new(data, "image/jpeg")
            }
            Err(e) => {
                warn!("Failed to convert WebP to JPEG: {}. Embedding original WebP", e);
                Self::new(self.data, "image/webp")
            }
        }
    }
}

fn webp_to_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, CoverError> {
    let img = image::load_from_memory_with_format(data, ImageFormat::WebP)?;
    // JPEG has no alpha or palette
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct CoverFetcher {
    client: reqwest::Client,
}

impl CoverFetcher {
    pub fn new(timeout: Duration) -> Result<Self, CoverError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Download a thumbnail
    pub async fn fetch(&self, url: &str) -> Result<CoverImage, CoverError> {
        debug!("Fetching thumbnail: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoverError::Status(status));
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(mime_essence)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());

        let data = response.bytes().await?.to_vec();
        debug!("Thumbnail: {} bytes, {}", data.len(), mime);

        Ok(CoverImage::new(data, mime))
    }
}

/// `image/webp; charset=binary` -> `image/webp`
fn mime_essence(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
