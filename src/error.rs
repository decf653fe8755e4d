use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CjdkError {
    #[error("{0}")]
    Config(String),

    #[error("no {vendor} JDK is available for {os}-{arch}")]
    VendorNotFound {
        vendor: String,
        os: String,
        arch: String,
    },

    #[error("no JDK matching {vendor}:{version} for {os}-{arch}")]
    VersionNotFound {
        vendor: String,
        version: String,
        os: String,
        arch: String,
    },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("{algorithm} mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("archive entry escapes extraction root: {0}")]
    UnsafePath(String),

    #[error("failed to extract archive: {0}")]
    Extract(String),

    #[error("{0}")]
    Install(String),

    #[error("{} does not look like it contains a JDK or JRE", .0.display())]
    NoJavaHome(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CjdkError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CjdkError::Config(_) => 2,
            CjdkError::VendorNotFound { .. } | CjdkError::VersionNotFound { .. } => 3,
            CjdkError::Download { .. }
            | CjdkError::HashMismatch { .. }
            | CjdkError::UnsafePath(_)
            | CjdkError::Extract(_)
            | CjdkError::Install(_)
            | CjdkError::Io(_) => 4,
            CjdkError::NoJavaHome(_) => 1,
        }
    }
}
