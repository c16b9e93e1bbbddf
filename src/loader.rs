//! Archive loading collaborator.
//!
//! One batch run reads the archive exactly once through this seam; tests and
//! alternative sources (stdin, remote blobs) swap in their own impls.

use crate::error::{Result, XportError};
use std::path::Path;
use tracing::debug;

/// Source of raw archive text, keyed by path.
pub trait ArchiveLoader {
    /// Read the archive's full content.
    ///
    /// # Errors
    ///
    /// Returns an error when the path does not exist or cannot be read;
    /// both are fatal configuration errors for a batch run.
    fn load(&self, path: &Path) -> Result<String>;
}

/// Plain filesystem loader.
#[derive(Debug, Default)]
pub struct FileArchiveLoader;

impl FileArchiveLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveLoader for FileArchiveLoader {
    fn load(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(XportError::archive_not_found(path));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| XportError::path_error("read", path, e))?;
        debug!("Loaded archive {} ({} bytes)", path.display(), content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.js");
        std::fs::write(&path, "window.YTD.tweets.part0 = []").unwrap();

        let content = FileArchiveLoader::new().load(&path).unwrap();
        assert!(content.starts_with("window.YTD"));
    }

    #[test]
    fn missing_path_is_a_config_error() {
        let err = FileArchiveLoader::new()
            .load(Path::new("/no/such/archive.js"))
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("/no/such/archive.js"));
    }
}
