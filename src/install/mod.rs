pub mod download;
pub mod extract;

use std::fs;
use std::path::PathBuf;

use crate::error::CjdkError;
use crate::index::ArchiveType;
use crate::progress::ProgressSink;

pub use download::Hashes;

/// Download an archive into `scratch`, verify it, extract it, and return the
/// tree to publish (with the strip-one rule applied). The caller renames the
/// result into its final location; nothing here is visible outside `scratch`.
pub async fn fetch_and_extract(
    url: &str,
    archive_type: ArchiveType,
    hashes: &Hashes,
    scratch: PathBuf,
    progress: &dyn ProgressSink,
    message: &str,
) -> Result<PathBuf, CjdkError> {
    let archive = scratch.join(format!("archive.{}", archive_type.name()));
    download::download(url, &archive, hashes, progress, message).await?;

    let tree = scratch.join("tree");
    fs::create_dir(&tree)?;
    extract::extract(&archive, archive_type, &tree)?;

    // The published root holds only the extracted contents.
    fs::remove_file(&archive)?;
    extract::lift_root(&tree)
}
