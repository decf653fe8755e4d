use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::{self, CacheLayout, Section};
use crate::config::{configure, EnvConfig, Options};
use crate::error::CjdkError;
use crate::index::{self, ArchiveType};
use crate::install::{self, Hashes};
use crate::jdk;
use crate::progress;

/// Download and extract the configured JDK if it is not already cached.
pub async fn cache_jdk(options: Options, env: &EnvConfig) -> Result<(), CjdkError> {
    let config = configure(options, env)?;
    let progress = progress::sink_for(config.progress);
    jdk::install_jdk(&config, progress.as_ref()).await?;
    Ok(())
}

/// The Java home directory for the configured JDK, installing if necessary.
pub async fn java_home(options: Options, env: &EnvConfig) -> Result<PathBuf, CjdkError> {
    let config = configure(options, env)?;
    let progress = progress::sink_for(config.progress);
    let path = jdk::install_jdk(&config, progress.as_ref()).await?;
    jdk::find_home(&path)
}

// Process-wide: concurrent in-process scopes must not interleave their
// save/restore of JAVA_HOME and PATH.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Scope guard holding `JAVA_HOME` (and optionally `PATH`) pointed at a JDK.
/// The previous values are restored when the guard drops, on success or
/// failure alike.
pub struct JavaEnv {
    home: PathBuf,
    saved_java_home: Option<OsString>,
    saved_path: Option<OsString>,
    path_modified: bool,
    _guard: MutexGuard<'static, ()>,
}

impl JavaEnv {
    pub fn home(&self) -> &Path {
        &self.home
    }
}

impl Drop for JavaEnv {
    fn drop(&mut self) {
        restore_var("JAVA_HOME", self.saved_java_home.take());
        if self.path_modified {
            restore_var("PATH", self.saved_path.take());
        }
    }
}

fn restore_var(name: &str, saved: Option<OsString>) {
    match saved {
        Some(value) => std::env::set_var(name, value),
        None => std::env::remove_var(name),
    }
}

/// Prepend `<home>/bin` to a PATH-style value.
pub fn path_with_bin(home: &Path, path: Option<&OsString>) -> Result<OsString, CjdkError> {
    let mut parts = vec![home.join("bin")];
    if let Some(path) = path {
        parts.extend(std::env::split_paths(path));
    }
    std::env::join_paths(parts)
        .map_err(|err| CjdkError::Install(format!("cannot build PATH: {err}")))
}

/// Install the configured JDK and set `JAVA_HOME` (plus `PATH` when
/// `add_bin`) for the life of the returned guard.
pub async fn java_env(
    options: Options,
    env: &EnvConfig,
    add_bin: bool,
) -> Result<JavaEnv, CjdkError> {
    let home = java_home(options, env).await?;
    let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let saved_java_home = std::env::var_os("JAVA_HOME");
    let saved_path = std::env::var_os("PATH");
    let new_path = if add_bin {
        Some(path_with_bin(&home, saved_path.as_ref())?)
    } else {
        None
    };

    std::env::set_var("JAVA_HOME", &home);
    if let Some(new_path) = &new_path {
        std::env::set_var("PATH", new_path);
    }
    Ok(JavaEnv {
        home,
        saved_java_home,
        saved_path,
        path_modified: add_bin,
        _guard: guard,
    })
}

/// Download an arbitrary file into the cache under `filename`, refreshing
/// when older than `ttl` seconds.
pub async fn cache_file(
    options: Options,
    env: &EnvConfig,
    name: &str,
    url: &str,
    filename: &str,
    ttl: Option<u64>,
    hashes: Hashes,
) -> Result<PathBuf, CjdkError> {
    let config = configure(options, env)?;
    let layout = CacheLayout::new(config.cache_dir.clone());
    let key = cache::name_hash(url);
    let progress = progress::sink_for(config.progress);
    let message = format!("Downloading {name}");
    cache::ensure_file(&layout, Section::Files, &key, filename, ttl, |scratch| async move {
        install::download::download(url, &scratch, &hashes, progress.as_ref(), &message).await
    })
    .await
}

/// Download and extract an arbitrary archive into the cache.
pub async fn cache_package(
    options: Options,
    env: &EnvConfig,
    name: &str,
    url: &str,
    hashes: Hashes,
) -> Result<PathBuf, CjdkError> {
    let config = configure(options, env)?;
    let layout = CacheLayout::new(config.cache_dir.clone());
    let (archive_type, url) = ArchiveType::split_url(url)?;
    let key = cache::install_key(archive_type, &url);
    let progress = progress::sink_for(config.progress);
    let message = format!("Downloading {name}");
    cache::ensure_dir(&layout, Section::Pkgs, &key, |scratch| async move {
        install::fetch_and_extract(
            &url,
            archive_type,
            &hashes,
            scratch,
            progress.as_ref(),
            &message,
        )
        .await
    })
    .await
}

/// All vendors appearing in the index, across every os/arch.
pub async fn list_vendors(options: Options, env: &EnvConfig) -> Result<Vec<String>, CjdkError> {
    let config = configure(options, env)?;
    let layout = CacheLayout::new(config.cache_dir.clone());
    let index = index::fetch::load(&config, &layout).await?;
    Ok(index.all_vendors())
}

/// `vendor:version` strings matching the configured criteria. Without an
/// explicit vendor every vendor is searched; `cached_only` keeps only JDKs
/// already materialized in the cache.
pub async fn list_jdks(
    options: Options,
    env: &EnvConfig,
    cached_only: bool,
) -> Result<Vec<String>, CjdkError> {
    let options = options.normalized()?;
    let vendor_filter = options.vendor.clone();
    let config = configure(options, env)?;
    let layout = CacheLayout::new(config.cache_dir.clone());
    let index = index::fetch::load(&config, &layout).await?;

    let vendors = match vendor_filter {
        Some(vendor) => vec![vendor],
        None => index.vendors(&config.os, &config.arch),
    };
    let installed: HashSet<String> = cache::list_installed(&layout)?
        .into_iter()
        .map(|(key, _)| key)
        .collect();

    let mut jdks = Vec::new();
    for vendor in vendors {
        let Some(entries) = index.entries(&config.os, &config.arch, &vendor) else {
            continue;
        };
        for (version, url) in entries {
            if !config.version.matches(version, &vendor) {
                continue;
            }
            if cached_only {
                let Ok((archive_type, url)) = ArchiveType::split_url(url) else {
                    continue;
                };
                if !installed.contains(&cache::install_key(archive_type, &url)) {
                    continue;
                }
            }
            jdks.push(format!("{vendor}:{version}"));
        }
    }
    Ok(jdks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    Jdks,
    Index,
    Files,
    Pkgs,
    All,
}

impl ClearScope {
    fn sections(self) -> &'static [Section] {
        match self {
            ClearScope::Jdks => &[Section::Jdks],
            ClearScope::Index => &[Section::Index],
            ClearScope::Files => &[Section::Files],
            ClearScope::Pkgs => &[Section::Pkgs],
            ClearScope::All => &[Section::Jdks, Section::Index, Section::Files, Section::Pkgs],
        }
    }
}

/// Remove cached data in the given scope. Installs locked by another process
/// are skipped and reported.
pub fn clear_cache(options: Options, env: &EnvConfig, scope: ClearScope) -> Result<(), CjdkError> {
    let config = configure(options, env)?;
    let layout = CacheLayout::new(config.cache_dir.clone());
    for &section in scope.sections() {
        cache::clear_section(&layout, section)?;
    }
    Ok(())
}
