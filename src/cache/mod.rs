pub mod lock;

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha1::{Digest, Sha1};

use crate::error::CjdkError;
use crate::index::ArchiveType;
use lock::LockFile;

// Reserved for on-disk schema evolution.
const SCHEMA_VERSION: &str = "v0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Jdks,
    Index,
    Files,
    Pkgs,
}

impl Section {
    pub fn dir_name(self) -> &'static str {
        match self {
            Section::Jdks => "jdks",
            Section::Index => "index",
            Section::Files => "files",
            Section::Pkgs => "pkgs",
        }
    }
}

/// Content-addressed identity of a materialized install: two descriptors
/// sharing an archive type and URL share one install.
pub fn install_key(archive_type: ArchiveType, url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(archive_type.name().as_bytes());
    hasher.update(b"+");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Directory key for cached single files and index URLs.
pub fn name_hash(name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// On-disk layout of the cache, rooted at the configured base directory.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: PathBuf) -> CacheLayout {
        CacheLayout { root }
    }

    pub fn section_dir(&self, section: Section) -> PathBuf {
        self.root.join(SCHEMA_VERSION).join(section.dir_name())
    }

    pub fn entry_dir(&self, section: Section, key: &str) -> PathBuf {
        self.section_dir(section).join(key)
    }

    pub fn partial_dir(&self, section: Section, key: &str) -> PathBuf {
        self.section_dir(section).join(format!("{key}.partial"))
    }

    pub fn lock_path(&self, section: Section, key: &str) -> PathBuf {
        self.section_dir(section).join(format!("{key}.lock"))
    }
}

/// Materialize a directory entry exactly once. `fetch` populates the given
/// scratch directory and returns the tree to publish; the rename into place
/// happens under the entry's lock, so concurrent processes see either
/// nothing or the completed install.
pub async fn ensure_dir<F, Fut>(
    layout: &CacheLayout,
    section: Section,
    key: &str,
    fetch: F,
) -> Result<PathBuf, CjdkError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<PathBuf, CjdkError>>,
{
    let target = layout.entry_dir(section, key);
    if target.is_dir() {
        tracing::debug!("already installed at {}", target.display());
        return Ok(target);
    }
    fs::create_dir_all(layout.section_dir(section))?;
    let _lock = LockFile::acquire(layout.lock_path(section, key))?;
    if target.is_dir() {
        // Another process finished the install while we waited.
        return Ok(target);
    }

    let partial = layout.partial_dir(section, key);
    if partial.exists() {
        // Leftover from a crashed or canceled attempt.
        tracing::debug!("removing stale scratch dir {}", partial.display());
        fs::remove_dir_all(&partial)?;
    }
    fs::create_dir_all(&partial)?;

    match fetch(partial.clone()).await {
        Ok(tree) => {
            fs::rename(&tree, &target)?;
            let _ = fs::remove_dir_all(&partial);
            Ok(target)
        }
        Err(err) => {
            let _ = fs::remove_dir_all(&partial);
            Err(err)
        }
    }
}

/// Materialize a single cached file, refreshing it when older than `ttl`
/// seconds. `None` means the file never goes stale.
pub async fn ensure_file<F, Fut>(
    layout: &CacheLayout,
    section: Section,
    key: &str,
    filename: &str,
    ttl: Option<u64>,
    fetch: F,
) -> Result<PathBuf, CjdkError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<(), CjdkError>>,
{
    let target = layout.entry_dir(section, key).join(filename);
    if file_is_fresh(&target, ttl) {
        return Ok(target);
    }
    fs::create_dir_all(layout.section_dir(section))?;
    let _lock = LockFile::acquire(layout.lock_path(section, key))?;
    if file_is_fresh(&target, ttl) {
        return Ok(target);
    }

    let partial = layout.partial_dir(section, key);
    if partial.exists() {
        fs::remove_dir_all(&partial)?;
    }
    fs::create_dir_all(&partial)?;

    let scratch = partial.join(filename);
    match fetch(scratch.clone()).await {
        Ok(()) => {
            fs::create_dir_all(layout.entry_dir(section, key))?;
            fs::rename(&scratch, &target)?;
            let _ = fs::remove_dir_all(&partial);
            Ok(target)
        }
        Err(err) => {
            let _ = fs::remove_dir_all(&partial);
            Err(err)
        }
    }
}

fn file_is_fresh(path: &Path, ttl: Option<u64>) -> bool {
    if !path.is_file() {
        return false;
    }
    match ttl {
        None => true,
        Some(0) => false,
        Some(ttl) => {
            let age = fs::metadata(path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|mtime| SystemTime::now().duration_since(mtime).ok());
            matches!(age, Some(age) if age.as_secs() < ttl)
        }
    }
}

/// Installed entries under `jdks/`, skipping scratch dirs and lock files.
pub fn list_installed(layout: &CacheLayout) -> Result<Vec<(String, PathBuf)>, CjdkError> {
    let dir = layout.section_dir(Section::Jdks);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut installed = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.ends_with(".partial") {
            continue;
        }
        installed.push((name.to_string(), entry.path()));
    }
    installed.sort();
    Ok(installed)
}

/// Best-effort recursive delete of one cache section. Installs whose lock is
/// currently held elsewhere are skipped and reported; other failures are
/// logged without aborting the sweep.
pub fn clear_section(layout: &CacheLayout, section: Section) -> Result<(), CjdkError> {
    let dir = layout.section_dir(section);
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str().map(str::to_string) else {
            continue;
        };

        if name.ends_with(".lock") {
            // Removed together with its entry below, if at all.
            continue;
        }
        if name.ends_with(".partial") {
            if let Err(err) = fs::remove_dir_all(&path) {
                tracing::warn!("failed to remove {}: {err}", path.display());
            }
            continue;
        }
        if !entry.file_type()?.is_dir() {
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!("failed to remove {}: {err}", path.display());
            }
            continue;
        }

        let lock_path = layout.lock_path(section, &name);
        match LockFile::try_acquire(lock_path.clone()) {
            Ok(Some(lock)) => {
                if let Err(err) = fs::remove_dir_all(&path) {
                    tracing::warn!("failed to remove {}: {err}", path.display());
                }
                drop(lock);
                let _ = fs::remove_file(&lock_path);
            }
            Ok(None) => {
                tracing::warn!("{} is in use, not removing", path.display());
            }
            Err(err) => {
                tracing::warn!("cannot lock {}: {err}", lock_path.display());
            }
        }
    }
    Ok(())
}
