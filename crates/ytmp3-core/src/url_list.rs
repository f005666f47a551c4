//! URL list file parsing

use crate::error::UrlListError;
use std::path::Path;

/// Read a URL list: one URL per line, blank lines and `#` comments skipped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>, UrlListError> {
    if !path.is_file() {
        return Err(UrlListError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| UrlListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let urls = parse_url_list(&content);
    if urls.is_empty() {
        return Err(UrlListError::Empty(path.to_path_buf()));
    }

    Ok(urls)
}

pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}
