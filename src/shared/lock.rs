use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

// Held for a whole `convert --lock-file` run; released when dropped.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    // Fails immediately rather than waiting when another run holds the lock.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating lock directory failed: {}", parent.display())
            })?;
        }

        // The file's contents are never used, only its lock state.
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening lock file failed: {}", path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!("another conversion holds the lock: {}", path.display())
        })?;

        debug!("Acquired conversion lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.file.unlock().is_ok() {
            debug!("Released conversion lock {}", self.path.display());
        }
    }
}
