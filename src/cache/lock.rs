use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::FileExt;

/// Exclusive cross-process advisory lock on a lock file. Held for the
/// lifetime of the value; the lock file itself is left behind on release.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Block until the lock is acquired.
    pub fn acquire(path: PathBuf) -> io::Result<LockFile> {
        let file = Self::open(&path)?;
        file.lock_exclusive()?;
        tracing::debug!("acquired lock {}", path.display());
        Ok(LockFile { file, path })
    }

    /// Acquire without blocking; `None` if another process holds the lock.
    pub fn try_acquire(path: PathBuf) -> io::Result<Option<LockFile>> {
        let file = Self::open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LockFile { file, path })),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) if err.raw_os_error() == fs4::lock_contended_error().raw_os_error() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!("failed to unlock {}: {err}", self.path.display());
        }
    }
}
