//! Exclusive handle on the ledger file
//!
//! The ledger is rewritten by rename, so the advisory lock lives on a sidecar
//! `.lock` file that is never replaced. The OS drops the lock with the process,
//! so a crashed run never leaves the state file wedged.

use super::Ledger;
use crate::error::TradeError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    lock: File,
}

impl StateFile {
    /// Claim `path` for this process. Fails at once if another holder exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TradeError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock.try_lock_exclusive().map_err(|e| {
            TradeError::Storage(format!(
                "state file {} is in use by another process: {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "state file locked");
        Ok(Self { path, lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Ledger, TradeError> {
        Ledger::load(&self.path)
    }

    pub fn save(&self, ledger: &Ledger) -> Result<(), TradeError> {
        ledger.save(&self.path)
    }
}

impl Drop for StateFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock);
    }
}
