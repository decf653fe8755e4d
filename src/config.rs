use std::path::PathBuf;

use crate::error::CjdkError;
use crate::version::VersionExpr;

pub const DEFAULT_VENDOR: &str = "adoptium";
pub const DEFAULT_INDEX_TTL: u64 = 86400;

// The coursier JDK index is auto-generated, well curated, and clean.
pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/coursier/jvm-index/master/index.json";

/// Caller-facing knobs for the public operations. Everything is optional;
/// `configure` applies env values and defaults in one place.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub jdk: Option<String>,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub index_url: Option<String>,
    pub index_ttl: Option<u64>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub progress: Option<bool>,
}

impl Options {
    /// Fold the `vendor:version` shorthand into the separate fields, erroring
    /// if both forms were given.
    pub fn normalized(mut self) -> Result<Options, CjdkError> {
        if let Some(jdk) = self.jdk.take() {
            if self.vendor.is_some() {
                return Err(CjdkError::Config(
                    "cannot specify --jdk together with a vendor".to_string(),
                ));
            }
            if self.version.is_some() {
                return Err(CjdkError::Config(
                    "cannot specify --jdk together with a version".to_string(),
                ));
            }
            let (vendor, version) = parse_jdk_spec(&jdk)?;
            if !vendor.is_empty() {
                self.vendor = Some(vendor);
            }
            if !version.is_empty() {
                self.version = Some(version);
            }
        }
        Ok(self)
    }
}

/// Environment overrides, ingested separately from the process environment so
/// the rest of the crate never reads env vars itself. Empty values count as
/// unset.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub vendor: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub index_url: Option<String>,
    pub index_ttl: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub hide_progress: bool,
}

impl EnvConfig {
    pub fn from_env() -> EnvConfig {
        EnvConfig::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> EnvConfig {
        let nonempty = |name: &str| get(name).filter(|v| !v.is_empty());
        EnvConfig {
            vendor: nonempty("CJDK_VENDOR"),
            cache_dir: nonempty("CJDK_CACHE_DIR").map(PathBuf::from),
            index_url: nonempty("CJDK_INDEX_URL"),
            index_ttl: nonempty("CJDK_INDEX_TTL"),
            os: nonempty("CJDK_OS"),
            arch: nonempty("CJDK_ARCH"),
            hide_progress: matches!(
                nonempty("CJDK_HIDE_PROGRESS_BARS").as_deref(),
                Some("1") | Some("yes") | Some("true")
            ),
        }
    }
}

/// Fully resolved configuration shared by every operation.
#[derive(Debug, Clone)]
pub struct Config {
    pub os: String,
    pub arch: String,
    pub vendor: String,
    pub version: VersionExpr,
    pub cache_dir: PathBuf,
    pub index_url: String,
    pub index_ttl: u64,
    pub progress: bool,
}

pub fn configure(options: Options, env: &EnvConfig) -> Result<Config, CjdkError> {
    let options = options.normalized()?;
    let index_ttl = match options.index_ttl {
        Some(ttl) => ttl,
        None => match &env.index_ttl {
            Some(raw) => raw
                .parse()
                .map_err(|_| CjdkError::Config(format!("invalid CJDK_INDEX_TTL value '{raw}'")))?,
            None => DEFAULT_INDEX_TTL,
        },
    };
    Ok(Config {
        os: canonical_os(options.os.or_else(|| env.os.clone())),
        arch: canonical_arch(options.arch.or_else(|| env.arch.clone())),
        vendor: options
            .vendor
            .or_else(|| env.vendor.clone())
            .unwrap_or_else(|| DEFAULT_VENDOR.to_string()),
        version: VersionExpr::parse(options.version.as_deref().unwrap_or("")),
        cache_dir: match options.cache_dir.or_else(|| env.cache_dir.clone()) {
            Some(dir) => dir,
            None => default_cache_dir()?,
        },
        index_url: options
            .index_url
            .or_else(|| env.index_url.clone())
            .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
        index_ttl,
        progress: options.progress.unwrap_or(!env.hide_progress),
    })
}

fn default_cache_dir() -> Result<PathBuf, CjdkError> {
    dirs::cache_dir()
        .map(|dir| dir.join("cjdk"))
        .ok_or_else(|| CjdkError::Config("cannot determine user cache directory".to_string()))
}

fn canonical_os(name: Option<String>) -> String {
    let name = name
        .unwrap_or_else(|| std::env::consts::OS.to_string())
        .to_lowercase();
    match name.as_str() {
        "darwin" | "macos" => "mac".to_string(),
        "win32" => "windows".to_string(),
        _ => name,
    }
}

fn canonical_arch(name: Option<String>) -> String {
    let name = name
        .unwrap_or_else(|| std::env::consts::ARCH.to_string())
        .to_lowercase();
    match name.as_str() {
        "x86_64" | "x86-64" | "x64" => "amd64".to_string(),
        "arm64" => "aarch64".to_string(),
        "i386" | "i486" | "i586" | "i686" => "x86".to_string(),
        _ => name,
    }
}

// Disambiguate a bare `vendor` or `version` given without a colon.
fn parse_jdk_spec(spec: &str) -> Result<(String, String), CjdkError> {
    if let Some((vendor, version)) = spec.split_once(':') {
        if version.contains(':') {
            return Err(CjdkError::Config(format!("cannot parse JDK spec '{spec}'")));
        }
        return Ok((vendor.to_string(), version.to_string()));
    }
    if spec.is_empty() {
        return Ok((String::new(), String::new()));
    }
    if looks_like_vendor(spec) {
        return Ok((spec.to_string(), String::new()));
    }
    if looks_like_version(spec) {
        return Ok((String::new(), spec.to_string()));
    }
    Err(CjdkError::Config(format!("cannot parse JDK spec '{spec}'")))
}

fn looks_like_vendor(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn looks_like_version(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '.' || c == '-')
}
