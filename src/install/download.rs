use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tokio::io::AsyncWriteExt;

use crate::error::CjdkError;
use crate::progress::ProgressSink;

/// Expected digests of a download. All supplied hashes are checked in one
/// streaming pass; any mismatch aborts the install.
#[derive(Debug, Clone, Default)]
pub struct Hashes {
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub sha512: Option<String>,
    pub md5: Option<String>,
}

impl Hashes {
    pub fn sha1(hash: Option<String>) -> Hashes {
        Hashes {
            sha1: hash,
            ..Hashes::default()
        }
    }
}

struct Digests {
    sha1: Option<(Sha1, String)>,
    sha256: Option<(Sha256, String)>,
    sha512: Option<(Sha512, String)>,
    md5: Option<(Md5, String)>,
}

impl Digests {
    fn new(hashes: &Hashes) -> Digests {
        Digests {
            sha1: hashes.sha1.clone().map(|h| (Sha1::new(), h)),
            sha256: hashes.sha256.clone().map(|h| (Sha256::new(), h)),
            sha512: hashes.sha512.clone().map(|h| (Sha512::new(), h)),
            md5: hashes.md5.clone().map(|h| (Md5::new(), h)),
        }
    }

    fn update(&mut self, data: &[u8]) {
        if let Some((hasher, _)) = &mut self.sha1 {
            hasher.update(data);
        }
        if let Some((hasher, _)) = &mut self.sha256 {
            hasher.update(data);
        }
        if let Some((hasher, _)) = &mut self.sha512 {
            hasher.update(data);
        }
        if let Some((hasher, _)) = &mut self.md5 {
            hasher.update(data);
        }
    }

    fn verify(self) -> Result<(), CjdkError> {
        fn check(
            algorithm: &'static str,
            actual: String,
            expected: &str,
        ) -> Result<(), CjdkError> {
            if actual != expected.to_lowercase() {
                return Err(CjdkError::HashMismatch {
                    algorithm,
                    expected: expected.to_string(),
                    actual,
                });
            }
            Ok(())
        }
        if let Some((hasher, expected)) = self.sha1 {
            check("sha1", format!("{:x}", hasher.finalize()), &expected)?;
        }
        if let Some((hasher, expected)) = self.sha256 {
            check("sha256", format!("{:x}", hasher.finalize()), &expected)?;
        }
        if let Some((hasher, expected)) = self.sha512 {
            check("sha512", format!("{:x}", hasher.finalize()), &expected)?;
        }
        if let Some((hasher, expected)) = self.md5 {
            check("md5", format!("{:x}", hasher.finalize()), &expected)?;
        }
        Ok(())
    }
}

/// Stream `url` to `dest`, feeding every requested digest along the way.
pub async fn download(
    url: &str,
    dest: &Path,
    hashes: &Hashes,
    progress: &dyn ProgressSink,
    message: &str,
) -> Result<(), CjdkError> {
    tracing::info!("downloading {url}");

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

    progress.begin(message, response.content_length());

    let mut digests = Digests::new(hashes);
    let mut file = tokio::fs::File::create(dest).await?;
    let mut response = response;
    while let Some(chunk) = response.chunk().await.map_err(|err| CjdkError::Download {
        url: url.to_string(),
        reason: err.to_string(),
    })? {
        digests.update(&chunk);
        file.write_all(&chunk).await?;
        progress.advance(chunk.len() as u64);
    }
    file.flush().await?;
    progress.finish();

    digests.verify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Silent;
    use httpmock::prelude::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn download_writes_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/data.bin");
                then.status(200).body("payload");
            })
            .await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("data.bin");

        download(
            &server.url("/data.bin"),
            &dest,
            &Hashes::default(),
            &Silent,
            "Downloading",
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn non_2xx_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.bin");
                then.status(404);
            })
            .await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing.bin");

        let result = download(
            &server.url("/missing.bin"),
            &dest,
            &Hashes::default(),
            &Silent,
            "Downloading",
        )
        .await;
        assert!(matches!(result, Err(CjdkError::Download { .. })));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn matching_hashes_pass() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/data.bin");
                then.status(200).body("payload");
            })
            .await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("data.bin");

        // Digests of b"payload", uppercase to exercise case folding.
        let hashes = Hashes {
            sha1: Some("F07E5A815613C5ABEDDC4B682247A4C42D8A95DF".to_string()),
            sha256: Some(
                "239F59ED55E737C77147CF55AD0C1B030B6D7EE748A7426952F9B852D5A935E5".to_string(),
            ),
            md5: Some("321c3cf486ed509164edec1e1981fec8".to_string()),
            ..Hashes::default()
        };
        download(&server.url("/data.bin"), &dest, &hashes, &Silent, "dl")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn hash_mismatch_is_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/data.bin");
                then.status(200).body("payload");
            })
            .await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("data.bin");

        let hashes = Hashes {
            sha512: Some("deadbeef".to_string()),
            ..Hashes::default()
        };
        let result = download(&server.url("/data.bin"), &dest, &hashes, &Silent, "dl").await;
        assert!(matches!(
            result,
            Err(CjdkError::HashMismatch {
                algorithm: "sha512",
                ..
            })
        ));
    }
}
