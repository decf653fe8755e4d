use std::path::{Path, PathBuf};

use crate::cache::{self, CacheLayout, Section};
use crate::config::Config;
use crate::error::CjdkError;
use crate::index::{self, ArchiveDescriptor, Index};
use crate::install::{self, Hashes};
use crate::progress::ProgressSink;

pub fn resolve(index: &Index, config: &Config) -> Result<ArchiveDescriptor, CjdkError> {
    index.select(&config.os, &config.arch, &config.vendor, &config.version)
}

/// Resolve and materialize the configured JDK, returning the install root.
/// Does nothing beyond a lookup when the JDK is already cached.
pub async fn install_jdk(
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<PathBuf, CjdkError> {
    let layout = CacheLayout::new(config.cache_dir.clone());
    let index = index::fetch::load(config, &layout).await?;
    let descriptor = resolve(&index, config)?;
    install_descriptor(&layout, &descriptor, config, progress).await
}

pub async fn install_descriptor(
    layout: &CacheLayout,
    descriptor: &ArchiveDescriptor,
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<PathBuf, CjdkError> {
    let key = cache::install_key(descriptor.archive_type, &descriptor.url);
    let hashes = Hashes::sha1(descriptor.sha1.clone());
    let already = layout.entry_dir(Section::Jdks, &key).is_dir();
    if !already {
        tracing::info!(
            "installing {}:{} to {}",
            descriptor.vendor,
            descriptor.version,
            config.cache_dir.display()
        );
    }
    cache::ensure_dir(layout, Section::Jdks, &key, |scratch| {
        install::fetch_and_extract(
            &descriptor.url,
            descriptor.archive_type,
            &hashes,
            scratch,
            progress,
            "Downloading JDK",
        )
    })
    .await
}

/// Find the Java home within an install root. The root may be the home
/// itself, a directory containing it, or (on macOS) a bundle with
/// Contents/Home.
pub fn find_home(path: &Path) -> Result<PathBuf, CjdkError> {
    find_home_depth(path, 2).ok_or_else(|| CjdkError::NoJavaHome(path.to_path_buf()))
}

fn find_home_depth(path: &Path, depth: u8) -> Option<PathBuf> {
    if looks_like_java_home(path) {
        return Some(path.to_path_buf());
    }
    let macos_home = path.join("Contents").join("Home");
    if looks_like_java_home(&macos_home) {
        return Some(macos_home);
    }
    if depth > 0 {
        if let Some(subdir) = single_subdir(path) {
            return find_home_depth(&subdir, depth - 1);
        }
    }
    None
}

fn looks_like_java_home(path: &Path) -> bool {
    let bin = path.join("bin");
    bin.is_dir() && (bin.join("java").is_file() || bin.join("java.exe").is_file())
}

fn single_subdir(path: &Path) -> Option<PathBuf> {
    let mut dirs = std::fs::read_dir(path)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_dir());
    let first = dirs.next()?;
    if dirs.next().is_some() {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn make_home(root: &Path) {
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("bin").join("java"), b"java").unwrap();
    }

    #[test]
    fn find_home_direct() {
        let dir = tempdir().unwrap();
        make_home(dir.path());
        assert_eq!(find_home(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn find_home_macos_bundle() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("Contents").join("Home");
        make_home(&home);
        assert_eq!(find_home(dir.path()).unwrap(), home);
    }

    #[test]
    fn find_home_descends_single_subdirs() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("outer").join("jdk-17.0.3+7");
        make_home(&nested);
        assert_eq!(find_home(dir.path()).unwrap(), nested);
    }

    #[test]
    fn find_home_accepts_java_exe() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin").join("java.exe"), b"MZ").unwrap();
        assert_eq!(find_home(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn find_home_rejects_non_jdk_tree() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::create_dir_all(dir.path().join("legal")).unwrap();
        let err = find_home(dir.path()).unwrap_err();
        assert!(matches!(err, CjdkError::NoJavaHome(_)));
    }

    #[test]
    fn find_home_gives_up_below_depth_limit() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        make_home(&nested);
        assert!(find_home(dir.path()).is_err());
    }
}
