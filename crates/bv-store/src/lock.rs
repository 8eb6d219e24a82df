//! Cross-process advisory lock on the versions directory.
//!
//! Readers hold the shared side, writers the exclusive side. The lock is
//! released when the guard's file handle is dropped.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{describe, IoContext, StoreError};

#[derive(Debug, Clone)]
pub(crate) struct DirLock {
    path: PathBuf,
}

#[derive(Debug)]
pub(crate) struct DirLockGuard {
    _file: File,
}

impl DirLock {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn shared(&self) -> Result<DirLockGuard, StoreError> {
        let file = self.open()?;
        file.lock_shared()
            .io_context(|| describe("take shared lock on", &self.path))?;
        Ok(DirLockGuard { _file: file })
    }

    pub(crate) fn exclusive(&self) -> Result<DirLockGuard, StoreError> {
        let file = self.open()?;
        file.lock_exclusive()
            .io_context(|| describe("take exclusive lock on", &self.path))?;
        Ok(DirLockGuard { _file: file })
    }

    fn open(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .io_context(|| describe("open lock file", &self.path))
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).io_context(|| describe("create directory", dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_guards_coexist_and_exclusive_follows() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let lock = DirLock::new(temp.path().join("nested").join(".bv.lock"));
        let first = lock.shared()?;
        let second = lock.shared()?;
        drop(first);
        drop(second);
        let exclusive = lock.exclusive()?;
        assert!(temp.path().join("nested").join(".bv.lock").is_file());
        drop(exclusive);
        Ok(())
    }
}
