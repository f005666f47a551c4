//! ytmp3-core: download audio as MP3, tag it and embed cover art

pub mod batch;
pub mod config;
pub mod cover;
pub mod downloader;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod rename;
pub mod url_list;

pub use config::Config;
pub use error::{Result, Ytmp3Error};
