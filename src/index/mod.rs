pub mod fetch;

use std::collections::BTreeMap;

use crate::error::CjdkError;
use crate::version::{self, VersionExpr};

/// The index JSON as published: os -> arch -> vendor -> version -> url.
pub type RawIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Tgz,
    Tbz2,
    Txz,
    Zip,
    Tar,
}

impl ArchiveType {
    pub fn name(self) -> &'static str {
        match self {
            ArchiveType::Tgz => "tgz",
            ArchiveType::Tbz2 => "tbz2",
            ArchiveType::Txz => "txz",
            ArchiveType::Zip => "zip",
            ArchiveType::Tar => "tar",
        }
    }

    pub fn from_name(name: &str) -> Option<ArchiveType> {
        match name {
            "tgz" => Some(ArchiveType::Tgz),
            "tbz2" => Some(ArchiveType::Tbz2),
            "txz" => Some(ArchiveType::Txz),
            "zip" => Some(ArchiveType::Zip),
            "tar" => Some(ArchiveType::Tar),
            _ => None,
        }
    }

    fn from_suffix(url: &str) -> Option<ArchiveType> {
        if url.ends_with(".tar.gz") || url.ends_with(".tgz") {
            Some(ArchiveType::Tgz)
        } else if url.ends_with(".tar.bz2") || url.ends_with(".tbz2") {
            Some(ArchiveType::Tbz2)
        } else if url.ends_with(".tar.xz") || url.ends_with(".txz") {
            Some(ArchiveType::Txz)
        } else if url.ends_with(".zip") {
            Some(ArchiveType::Zip)
        } else if url.ends_with(".tar") {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }

    /// Split a `<type>+<url>` value into its archive type and bare URL,
    /// falling back to the URL suffix when there is no prefix.
    pub fn split_url(url: &str) -> Result<(ArchiveType, String), CjdkError> {
        if let Some((prefix, rest)) = url.split_once('+') {
            if let Some(archive_type) = ArchiveType::from_name(prefix) {
                return Ok((archive_type, rest.to_string()));
            }
        }
        ArchiveType::from_suffix(url)
            .map(|archive_type| (archive_type, url.to_string()))
            .ok_or_else(|| CjdkError::Config(format!("cannot infer archive type of '{url}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub vendor: String,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub url: String,
    pub archive_type: ArchiveType,
    pub sha1: Option<String>,
}

// Vendors whose Java major version is encoded in the vendor name; they are
// collapsed to the canonical name and the suffix moves into the version.
const SUFFIX_MERGED_VENDORS: &[&str] = &["ibm-semeru-openj9", "ibm-semeru-certified-openj9"];

fn normalize_vendor(raw: &str) -> (String, Option<String>) {
    let name = raw.strip_prefix("jdk@").unwrap_or(raw);
    for canonical in SUFFIX_MERGED_VENDORS {
        if let Some(major) = name.strip_prefix(&format!("{canonical}-java")) {
            if !major.is_empty() {
                return (canonical.to_string(), Some(format!("java{major}")));
            }
        }
    }
    (name.to_string(), None)
}

/// In-memory view of the resolved index: (os, arch) -> vendor -> ordered
/// (version, url) pairs.
#[derive(Debug, Clone)]
pub struct Index {
    platforms: BTreeMap<(String, String), BTreeMap<String, Vec<(String, String)>>>,
}

impl Index {
    pub fn build(raw: &RawIndex) -> Index {
        // vendor -> version -> (original vendor, url); duplicates created by
        // the suffix merge keep the lexicographically greatest original name.
        let mut merged: BTreeMap<(String, String), BTreeMap<String, BTreeMap<String, (String, String)>>> =
            BTreeMap::new();
        for (os, arches) in raw {
            for (arch, vendors) in arches {
                let platform = merged.entry((os.clone(), arch.clone())).or_default();
                for (raw_vendor, versions) in vendors {
                    let (vendor, suffix) = normalize_vendor(raw_vendor);
                    let by_version = platform.entry(vendor).or_default();
                    for (version, url) in versions {
                        let version = match &suffix {
                            Some(suffix) => format!("{version}-{suffix}"),
                            None => version.clone(),
                        };
                        match by_version.get(&version) {
                            Some((existing, _)) if existing.as_str() >= raw_vendor.as_str() => {}
                            _ => {
                                by_version.insert(version, (raw_vendor.clone(), url.clone()));
                            }
                        }
                    }
                }
            }
        }

        let mut platforms = BTreeMap::new();
        for (platform, vendors) in merged {
            let mut out: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (vendor, by_version) in vendors {
                let mut entries: Vec<(String, String)> = by_version
                    .into_iter()
                    .map(|(version, (_, url))| (version, url))
                    .collect();
                entries.sort_by(|a, b| version::compare(&a.0, &b.0, &vendor));
                out.insert(vendor, entries);
            }
            platforms.insert(platform, out);
        }
        Index { platforms }
    }

    pub fn vendors(&self, os: &str, arch: &str) -> Vec<String> {
        self.platforms
            .get(&(os.to_string(), arch.to_string()))
            .map(|vendors| vendors.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_vendors(&self) -> Vec<String> {
        let mut vendors: Vec<String> = self
            .platforms
            .values()
            .flat_map(|by_vendor| by_vendor.keys().cloned())
            .collect();
        vendors.sort();
        vendors.dedup();
        vendors
    }

    /// Ordered (version, url) pairs for one vendor, oldest first.
    pub fn entries(&self, os: &str, arch: &str, vendor: &str) -> Option<&[(String, String)]> {
        self.platforms
            .get(&(os.to_string(), arch.to_string()))?
            .get(vendor)
            .map(|entries| entries.as_slice())
    }

    pub fn versions(&self, os: &str, arch: &str, vendor: &str) -> Vec<String> {
        self.entries(os, arch, vendor)
            .map(|entries| entries.iter().map(|(version, _)| version.clone()).collect())
            .unwrap_or_default()
    }

    /// Pick the newest version of `vendor` matching `expr`.
    pub fn select(
        &self,
        os: &str,
        arch: &str,
        vendor: &str,
        expr: &VersionExpr,
    ) -> Result<ArchiveDescriptor, CjdkError> {
        let entries = self
            .entries(os, arch, vendor)
            .ok_or_else(|| CjdkError::VendorNotFound {
                vendor: vendor.to_string(),
                os: os.to_string(),
                arch: arch.to_string(),
            })?;
        let (version, url) = entries
            .iter()
            .rev()
            .find(|(version, _)| expr.matches(version, vendor))
            .ok_or_else(|| CjdkError::VersionNotFound {
                vendor: vendor.to_string(),
                version: expr.to_string(),
                os: os.to_string(),
                arch: arch.to_string(),
            })?;
        let (archive_type, url) = ArchiveType::split_url(url)?;
        Ok(ArchiveDescriptor {
            vendor: vendor.to_string(),
            version: version.clone(),
            os: os.to_string(),
            arch: arch.to_string(),
            url,
            archive_type,
            sha1: None,
        })
    }
}
