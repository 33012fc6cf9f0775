use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use siteqa_utils::error::RewriteError;

/// A derived tool config on disk, removed when dropped.
///
/// The file lives next to the config it was derived from so relative paths
/// inside it keep resolving. Removal happens on every path out of a stage,
/// including early returns and panics; a failed removal is logged and never
/// escalated.
#[derive(Debug)]
pub struct TempConfig {
    path: PathBuf,
}

impl TempConfig {
    /// Write `contents` to `path` and take ownership of the file.
    pub fn write(path: PathBuf, contents: &[u8]) -> Result<Self, RewriteError> {
        if let Err(e) = fs::write(&path, contents) {
            // A partial write must not outlive the stage either.
            let _ = fs::remove_file(&path);
            return Err(RewriteError::Write(e));
        }
        debug!(path = %path.display(), "Wrote temporary tool config");
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary tool config"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary tool config"
            ),
        }
    }
}

/// `test/pa11yci.json` → `test/pa11yci_temp.json`
#[must_use]
pub fn temp_path_for(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let name = match original.extension() {
        Some(ext) => format!("{stem}_temp.{}", ext.to_string_lossy()),
        None => format!("{stem}_temp"),
    };
    original.with_file_name(name)
}
