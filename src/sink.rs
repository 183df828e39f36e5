use std::{fs, path::Path};

use crate::error::{Result, ScrapeError};
use crate::models::SiteCollection;

/// Durable destination for collection snapshots.
pub trait SnapshotSink: Send + Sync {
    /// Overwrites `path`, creating it (and its parent) when absent.
    fn write_snapshot(&self, path: &Path, collection: &SiteCollection) -> Result<()>;

    fn read_snapshot(&self, path: &Path) -> Result<SiteCollection>;

    /// Truncates `path` to empty so a stale artifact cannot pass as current.
    fn reset(&self, path: &Path) -> Result<()>;
}

/// Pretty-printed JSON files.
pub struct JsonFileSink;

fn snapshot_err(path: &Path) -> impl FnOnce(std::io::Error) -> ScrapeError + '_ {
    move |source| ScrapeError::Snapshot {
        path: path.to_path_buf(),
        source,
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(snapshot_err(path))
        }
        _ => Ok(()),
    }
}

impl SnapshotSink for JsonFileSink {
    fn write_snapshot(&self, path: &Path, collection: &SiteCollection) -> Result<()> {
        ensure_parent(path)?;
        let contents = serde_json::to_string_pretty(collection)?;
        fs::write(path, contents).map_err(snapshot_err(path))
    }

    fn read_snapshot(&self, path: &Path) -> Result<SiteCollection> {
        let contents = fs::read_to_string(path).map_err(snapshot_err(path))?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn reset(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        fs::write(path, "").map_err(snapshot_err(path))
    }
}
