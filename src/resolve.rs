//! Audio reference resolution.
//!
//! Normalizes a user-supplied file reference (local absolute path or
//! remote URL, including vendor share links) and fetches the raw bytes
//! the probe operates on.

use std::path::Path;

use crate::error::{Result, SoundscopeError};

/// Normalized audio reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: String,
    pub is_remote: bool,
}

fn resolution_error(reference: &str, message: impl Into<String>) -> SoundscopeError {
    SoundscopeError::PathResolution {
        reference: reference.to_string(),
        message: message.into(),
    }
}

/// Percent-decodes the reference and classifies it as remote or local.
///
/// Local paths must be absolute; relative references are rejected here
/// rather than resolved against an unpredictable working directory.
pub fn normalize(reference: &str) -> Result<ResolvedPath> {
    let decoded = urlencoding::decode(reference)
        .map_err(|e| resolution_error(reference, format!("failed to decode path: {e}")))?
        .into_owned();

    if decoded.starts_with("http") {
        return Ok(ResolvedPath {
            path: decoded,
            is_remote: true,
        });
    }

    if !Path::new(&decoded).is_absolute() {
        return Err(resolution_error(
            reference,
            format!("path must be absolute: {decoded}"),
        ));
    }

    Ok(ResolvedPath {
        path: decoded,
        is_remote: false,
    })
}

pub fn is_google_drive_url(url: &str) -> bool {
    url.contains("drive.google.com")
}

pub fn is_dropbox_url(url: &str) -> bool {
    url.contains("dropbox.com")
}

/// Converts a Google Drive share URL into a direct-download URL.
pub fn convert_google_drive_url(share_url: &str) -> Result<String> {
    // Already a direct download URL
    if share_url.contains("uc?export=download&id=")
        || (share_url.contains("uc?id=") && share_url.contains("&export=download"))
    {
        return Ok(share_url.to_string());
    }

    let file_id = extract_drive_file_id(share_url).ok_or_else(|| {
        resolution_error(share_url, "invalid Google Drive URL format")
    })?;
    Ok(format!(
        "https://drive.google.com/uc?export=download&id={file_id}"
    ))
}

fn extract_drive_file_id(url: &str) -> Option<String> {
    let id_chars = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';

    // drive.google.com/file/d/<id>/...
    if let Some(rest) = url.split("/file/d/").nth(1) {
        let id: String = rest.chars().take_while(|&c| id_chars(c)).collect();
        if !id.is_empty() {
            return Some(id);
        }
    }
    // drive.google.com/open?id=<id> and uc?...id=<id>
    if let Some(rest) = url.split("id=").nth(1) {
        let id: String = rest.chars().take_while(|&c| id_chars(c)).collect();
        if !id.is_empty() {
            return Some(id);
        }
    }
    None
}

/// Converts a Dropbox share URL into a direct-download URL.
pub fn convert_dropbox_url(share_url: &str) -> Result<String> {
    if share_url.contains("dl=1") {
        return Ok(share_url.to_string());
    }
    if is_dropbox_url(share_url) && share_url.contains("dl=0") {
        return Ok(share_url.replacen("dl=0", "dl=1", 1));
    }
    Err(resolution_error(share_url, "invalid Dropbox URL format"))
}

/// Display file name for a reference: the last path segment, with any
/// query string stripped for URLs.
pub fn display_name(resolved: &ResolvedPath) -> String {
    let path = if resolved.is_remote {
        resolved.path.split(['?', '#']).next().unwrap_or("")
    } else {
        resolved.path.as_str()
    };
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("audio")
        .to_string()
}

/// Fetches the raw bytes behind a normalized reference.
///
/// Remote references get share-link rewriting first; local references
/// are read from disk. Returns the bytes together with the display name
/// so the caller reads the payload exactly once.
pub struct PathResolver {
    client: reqwest::Client,
}

impl PathResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch(&self, reference: &str) -> Result<(Vec<u8>, String)> {
        let resolved = normalize(reference)?;

        if !resolved.is_remote {
            let data = tokio::fs::read(&resolved.path).await.map_err(|e| {
                resolution_error(reference, format!("failed to read file: {e}"))
            })?;
            return Ok((data, display_name(&resolved)));
        }

        let url = if is_google_drive_url(&resolved.path) {
            convert_google_drive_url(&resolved.path)?
        } else if is_dropbox_url(&resolved.path) {
            convert_dropbox_url(&resolved.path)?
        } else {
            resolved.path.clone()
        };

        tracing::debug!(url, "downloading remote audio");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| resolution_error(reference, format!("download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(resolution_error(
                reference,
                format!("download failed with status {status}"),
            ));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| resolution_error(reference, format!("download read failed: {e}")))?
            .to_vec();
        Ok((data, display_name(&resolved)))
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_classifies_http_as_remote() {
        let resolved = normalize("https://example.com/sounds/rain.wav").unwrap();
        assert!(resolved.is_remote);
        assert_eq!(resolved.path, "https://example.com/sounds/rain.wav");
    }

    #[test]
    fn normalize_accepts_absolute_local_paths() {
        let resolved = normalize("/home/user/rain.wav").unwrap();
        assert!(!resolved.is_remote);
        assert_eq!(resolved.path, "/home/user/rain.wav");
    }

    #[test]
    fn normalize_rejects_relative_paths() {
        let err = normalize("sounds/rain.wav").unwrap_err();
        assert!(matches!(err, SoundscopeError::PathResolution { .. }));
    }

    #[test]
    fn normalize_percent_decodes_first() {
        let resolved = normalize("/home/user/street%20noise.wav").unwrap();
        assert_eq!(resolved.path, "/home/user/street noise.wav");
    }

    #[test]
    fn drive_file_url_is_rewritten_to_direct_download() {
        let url = "https://drive.google.com/file/d/1AbC_d-9xYz/view?usp=sharing";
        let converted = convert_google_drive_url(url).unwrap();
        assert_eq!(
            converted,
            "https://drive.google.com/uc?export=download&id=1AbC_d-9xYz"
        );
    }

    #[test]
    fn drive_open_url_is_rewritten() {
        let url = "https://drive.google.com/open?id=1AbC_d-9xYz";
        let converted = convert_google_drive_url(url).unwrap();
        assert_eq!(
            converted,
            "https://drive.google.com/uc?export=download&id=1AbC_d-9xYz"
        );
    }

    #[test]
    fn drive_direct_url_passes_through() {
        let url = "https://drive.google.com/uc?export=download&id=1AbC";
        assert_eq!(convert_google_drive_url(url).unwrap(), url);
    }

    #[test]
    fn drive_url_without_id_is_rejected() {
        let err = convert_google_drive_url("https://drive.google.com/drive/my-drive").unwrap_err();
        assert!(matches!(err, SoundscopeError::PathResolution { .. }));
    }

    #[test]
    fn dropbox_dl0_becomes_dl1() {
        let url = "https://www.dropbox.com/s/abc/rain.wav?dl=0";
        let converted = convert_dropbox_url(url).unwrap();
        assert_eq!(converted, "https://www.dropbox.com/s/abc/rain.wav?dl=1");
    }

    #[test]
    fn dropbox_dl1_passes_through() {
        let url = "https://www.dropbox.com/s/abc/rain.wav?dl=1";
        assert_eq!(convert_dropbox_url(url).unwrap(), url);
    }

    #[test]
    fn dropbox_without_dl_param_is_rejected() {
        assert!(convert_dropbox_url("https://www.dropbox.com/s/abc/rain.wav").is_err());
    }

    #[test]
    fn display_name_strips_url_query() {
        let resolved = normalize("https://example.com/sounds/rain.wav?token=x").unwrap();
        assert_eq!(display_name(&resolved), "rain.wav");
    }

    #[test]
    fn display_name_uses_local_base_name() {
        let resolved = normalize("/home/user/clips/rain.wav").unwrap();
        assert_eq!(display_name(&resolved), "rain.wav");
    }

    #[tokio::test]
    async fn fetch_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        tokio::fs::write(&path, b"RIFF....WAVE").await.unwrap();

        let resolver = PathResolver::new();
        let (data, name) = resolver.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(data, b"RIFF....WAVE");
        assert_eq!(name, "tone.wav");
    }

    #[tokio::test]
    async fn fetch_missing_local_file_is_resolution_error() {
        let resolver = PathResolver::new();
        let err = resolver.fetch("/definitely/not/here.wav").await.unwrap_err();
        assert!(matches!(err, SoundscopeError::PathResolution { .. }));
    }
}
