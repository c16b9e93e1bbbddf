//! Media uploader collaborators.
//!
//! The reference processor sideloads tweet photos through the
//! [`MediaUploader`] contract: fetch a remote image, land it in the media
//! directory, and report where it ended up. `HttpMediaUploader` does the real
//! work; `NullMediaUploader` stands in for dry runs.

use crate::error::{Result, XportError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// MIME types accepted for sideloaded media.
pub const ALLOWED_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// File extensions accepted when the server does not declare a content type.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One generated rendition of an uploaded item. The shipped uploaders do no
/// resizing, so the list stays empty; the shape exists for stores that do.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SizeVariant {
    pub name: String,
    pub url: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub filesize: u64,
    pub mime_type: String,
}

/// Result of a successful sideload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedMedia {
    /// Store-assigned identifier; the filename for file-backed uploaders.
    pub id: String,
    pub path: PathBuf,
    /// URL the compiled markup should reference.
    pub url: String,
    pub size_variants: Vec<SizeVariant>,
}

/// Sideload contract consumed by processors.
pub trait MediaUploader {
    /// Fetch `url` and store it under `filename`.
    ///
    /// # Errors
    ///
    /// Fails on a non-2xx response, a disallowed MIME type, or a local write
    /// failure.
    fn upload_from_url(&mut self, url: &str, filename: &str) -> Result<UploadedMedia>;
}

// =============================================================================
// HTTP uploader
// =============================================================================

/// Fetches media over HTTP(S) and writes it into a local media directory.
pub struct HttpMediaUploader {
    client: reqwest::blocking::Client,
    media_dir: PathBuf,
    /// Public base URL prefixed onto stored filenames; falls back to the
    /// local path when unset.
    url_base: Option<String>,
}

impl HttpMediaUploader {
    /// Create an uploader writing into `media_dir` (created if missing).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the HTTP
    /// client cannot be built.
    pub fn new(media_dir: impl Into<PathBuf>, url_base: Option<String>) -> Result<Self> {
        let media_dir = media_dir.into();
        std::fs::create_dir_all(&media_dir)
            .map_err(|e| XportError::path_error("create", &media_dir, e))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("xport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| XportError::with_context("Failed to build HTTP client", e))?;

        Ok(Self {
            client,
            media_dir,
            url_base,
        })
    }
}

impl MediaUploader for HttpMediaUploader {
    fn upload_from_url(&mut self, url: &str, filename: &str) -> Result<UploadedMedia> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| XportError::media(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(XportError::media(url, format!("HTTP status {status}")));
        }

        // Reject anything that is clearly not an image: either the declared
        // content type or, when the server stays silent, the file extension.
        let declared = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());
        match declared {
            Some(mime) if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) => {
                return Err(XportError::media(url, format!("disallowed MIME type '{mime}'")));
            }
            None if !has_allowed_extension(filename) => {
                return Err(XportError::media(
                    url,
                    format!("no content type and unrecognized extension on '{filename}'"),
                ));
            }
            _ => {}
        }

        let bytes = response
            .bytes()
            .map_err(|e| XportError::media(url, e.to_string()))?;

        let safe_name = sanitize_filename(filename);
        let unique = unique_file_name(&self.media_dir, &safe_name);
        let path = self.media_dir.join(&unique);
        std::fs::write(&path, &bytes).map_err(|e| XportError::path_error("write", &path, e))?;

        debug!("Sideloaded {url} to {} ({} bytes)", path.display(), bytes.len());

        let public_url = self.url_base.as_ref().map_or_else(
            || path.display().to_string(),
            |base| format!("{}/{unique}", base.trim_end_matches('/')),
        );

        Ok(UploadedMedia {
            id: unique,
            path,
            url: public_url,
            size_variants: Vec::new(),
        })
    }
}

// =============================================================================
// Null uploader
// =============================================================================

/// No-op uploader for dry runs: echoes the source URL, touches nothing.
#[derive(Debug, Default)]
pub struct NullMediaUploader;

impl NullMediaUploader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MediaUploader for NullMediaUploader {
    fn upload_from_url(&mut self, url: &str, filename: &str) -> Result<UploadedMedia> {
        Ok(UploadedMedia {
            id: sanitize_filename(filename),
            path: PathBuf::new(),
            url: url.to_string(),
            size_variants: Vec::new(),
        })
    }
}

// =============================================================================
// Filename helpers
// =============================================================================

/// Last path segment of a URL, with query and fragment stripped.
///
/// Media URLs like `https://pbs.twimg.com/media/abc.jpg?name=large` become
/// `abc.jpg`. Falls back to `media` when nothing usable remains.
#[must_use]
pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
        .trim();
    if name.is_empty() {
        "media".to_string()
    } else {
        name.to_string()
    }
}

/// Strip directory components so a hostile filename cannot escape the media
/// directory.
fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "media".to_string()
    } else {
        name.to_string()
    }
}

fn has_allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// First free variant of `name` in `dir`: `img.jpg`, `img-1.jpg`, `img-2.jpg`…
fn unique_file_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut n: u64 = 1;
    loop {
        let candidate = ext.map_or_else(
            || format!("{stem}-{n}"),
            |ext| format!("{stem}-{n}.{ext}"),
        );
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_url_strips_query_and_path() {
        assert_eq!(
            file_name_from_url("https://pbs.twimg.com/media/abc.jpg?name=large"),
            "abc.jpg"
        );
        assert_eq!(file_name_from_url("https://host/a/b/c.png"), "c.png");
        assert_eq!(file_name_from_url("https://host/img.webp#frag"), "img.webp");
        assert_eq!(file_name_from_url(""), "media");
        assert_eq!(file_name_from_url("https://host/"), "media");
    }

    #[test]
    fn sanitize_filename_drops_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\evil\name.png"), "name.png");
        assert_eq!(sanitize_filename(""), "media");
        assert_eq!(sanitize_filename(".."), "media");
        assert_eq!(sanitize_filename("plain.jpg"), "plain.jpg");
    }

    #[test]
    fn extension_allowlist() {
        assert!(has_allowed_extension("a.jpg"));
        assert!(has_allowed_extension("a.JPEG"));
        assert!(has_allowed_extension("a.webp"));
        assert!(!has_allowed_extension("a.mp4"));
        assert!(!has_allowed_extension("noext"));
    }

    #[test]
    fn unique_file_name_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_file_name(dir.path(), "img.jpg"), "img.jpg");

        std::fs::write(dir.path().join("img.jpg"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "img.jpg"), "img-1.jpg");

        std::fs::write(dir.path().join("img-1.jpg"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "img.jpg"), "img-2.jpg");
    }

    #[test]
    fn unique_file_name_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("img"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "img"), "img-1");
    }

    #[test]
    fn null_uploader_echoes_the_source() {
        let mut uploader = NullMediaUploader::new();
        let uploaded = uploader
            .upload_from_url("https://pbs.example/pic.jpg", "pic.jpg")
            .unwrap();
        assert_eq!(uploaded.url, "https://pbs.example/pic.jpg");
        assert_eq!(uploaded.id, "pic.jpg");
        assert!(uploaded.size_variants.is_empty());
    }
}
