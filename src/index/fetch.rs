use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::lock::LockFile;
use crate::cache::{self, CacheLayout, Section};
use crate::config::Config;
use crate::error::CjdkError;
use crate::index::{Index, RawIndex};

const INDEX_FILENAME: &str = "index.json";
const STAMP_FILENAME: &str = "fetched-at";

/// Load the JDK index for `config`, from the cache when fresh.
pub async fn load(config: &Config, layout: &CacheLayout) -> Result<Index, CjdkError> {
    let raw = if let Some(path) = local_index_path(&config.index_url) {
        read_index(&path)?
    } else {
        cached_index(config, layout).await?
    };
    Ok(Index::build(&raw))
}

// A URL without a scheme is a filesystem path, read directly on every call.
fn local_index_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if !url.contains("://") {
        return Some(PathBuf::from(url));
    }
    None
}

fn read_index(path: &Path) -> Result<RawIndex, CjdkError> {
    let data = fs::read_to_string(path)?;
    parse_index(data.as_bytes())
}

fn parse_index(data: &[u8]) -> Result<RawIndex, CjdkError> {
    serde_json::from_slice(data).map_err(|err| CjdkError::Install(format!("invalid JDK index: {err}")))
}

async fn cached_index(config: &Config, layout: &CacheLayout) -> Result<RawIndex, CjdkError> {
    let key = cache::name_hash(&config.index_url);
    let entry = layout.entry_dir(Section::Index, &key);
    let target = entry.join(INDEX_FILENAME);
    let stamp = entry.join(STAMP_FILENAME);

    if is_fresh(&stamp, config.index_ttl) && target.is_file() {
        return read_index(&target);
    }

    fs::create_dir_all(layout.section_dir(Section::Index))?;
    let _lock = LockFile::acquire(layout.lock_path(Section::Index, &key))?;
    if is_fresh(&stamp, config.index_ttl) && target.is_file() {
        // Refreshed by another process while we waited on the lock.
        return read_index(&target);
    }

    tracing::info!("fetching JDK index from {}", config.index_url);
    let body = http_get(&config.index_url).await?;
    let raw = parse_index(&body)?;

    fs::create_dir_all(&entry)?;
    let temp = entry.join(format!("{INDEX_FILENAME}.tmp"));
    {
        let mut file = File::create(&temp)?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    fs::rename(&temp, &target)?;
    fs::write(&stamp, now_epoch().to_string())?;

    Ok(raw)
}

fn is_fresh(stamp: &Path, ttl: u64) -> bool {
    if ttl == 0 {
        return false;
    }
    let Ok(contents) = fs::read_to_string(stamp) else {
        return false;
    };
    let Ok(fetched_at) = contents.trim().parse::<u64>() else {
        return false;
    };
    now_epoch().saturating_sub(fetched_at) < ttl
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn http_get(url: &str) -> Result<Vec<u8>, CjdkError> {
    let response = reqwest::get(url).await.map_err(|err| CjdkError::Download {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(CjdkError::Download {
            url: url.to_string(),
            reason: format!("HTTP status {}", response.status()),
        });
    }
    let body = response.bytes().await.map_err(|err| CjdkError::Download {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    Ok(body.to_vec())
}
