use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::EntryType;
use xz2::read::XzDecoder;

use crate::error::CjdkError;
use crate::index::ArchiveType;

pub fn extract(archive: &Path, archive_type: ArchiveType, dest: &Path) -> Result<(), CjdkError> {
    tracing::debug!(
        "extracting {} archive to {}",
        archive_type.name(),
        dest.display()
    );
    let file = File::open(archive)?;
    match archive_type {
        ArchiveType::Tgz => unpack_tar(tar::Archive::new(GzDecoder::new(file)), dest),
        ArchiveType::Tbz2 => unpack_tar(tar::Archive::new(BzDecoder::new(file)), dest),
        ArchiveType::Txz => unpack_tar(tar::Archive::new(XzDecoder::new(file)), dest),
        ArchiveType::Tar => unpack_tar(tar::Archive::new(file), dest),
        ArchiveType::Zip => unpack_zip(file, dest),
    }
}

fn unpack_tar<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<(), CjdkError> {
    archive.set_preserve_permissions(true);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let rel = entry
            .path()
            .map_err(|err| CjdkError::Extract(err.to_string()))?
            .into_owned();
        check_entry_path(&rel)?;

        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
            let target = entry
                .link_name()
                .map_err(|err| CjdkError::Extract(err.to_string()))?
                .ok_or_else(|| {
                    CjdkError::Extract(format!("link entry {} has no target", rel.display()))
                })?;
            if link_escapes(&rel, &target) {
                return Err(CjdkError::UnsafePath(format!(
                    "{} -> {}",
                    rel.display(),
                    target.display()
                )));
            }
        }

        let target = dest.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }
    Ok(())
}

fn unpack_zip(file: File, dest: &Path) -> Result<(), CjdkError> {
    let mut archive =
        zip::ZipArchive::new(file).map_err(|err| CjdkError::Extract(err.to_string()))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| CjdkError::Extract(err.to_string()))?;
        let name = entry.name().to_string();
        if name.contains('\\') || name.contains(':') {
            return Err(CjdkError::UnsafePath(name));
        }
        let rel = entry
            .enclosed_name()
            .ok_or_else(|| CjdkError::UnsafePath(name.clone()))?;

        let target = dest.join(&rel);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))?;
        }
    }
    Ok(())
}

// Entry paths must stay strictly inside the extraction root: no absolute
// paths, no parent-dir components, no Windows drive prefixes.
fn check_entry_path(path: &Path) -> Result<(), CjdkError> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(CjdkError::UnsafePath(path.display().to_string())),
        }
    }
    Ok(())
}

// A relative link target escapes if, resolved against the entry's directory,
// it ever climbs above the extraction root.
fn link_escapes(entry_path: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return true;
    }
    let mut depth = entry_path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count() as i64
        - 1;
    for component in target.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            _ => return true,
        }
    }
    false
}

/// The strip-one rule: a tree whose only entry is a directory is published as
/// that directory's contents, matching the usual JDK archive shape.
pub fn lift_root(tree: &Path) -> Result<PathBuf, CjdkError> {
    let entries = fs::read_dir(tree)?.collect::<io::Result<Vec<_>>>()?;
    if let [entry] = entries.as_slice() {
        if entry.file_type()?.is_dir() {
            return Ok(entry.path());
        }
    }
    Ok(tree.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn tar_gz(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for &(path, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            builder.append_data(&mut header, path, data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn write_archive(dir: &Path, bytes: &[u8]) -> PathBuf {
        let path = dir.join("archive.bin");
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn extracts_tgz_with_permissions() {
        let dir = tempdir().unwrap();
        let archive = write_archive(
            dir.path(),
            &tar_gz(&[
                ("jdk/bin/java", b"#!/bin/sh\n".as_slice(), 0o755),
                ("jdk/release", b"JAVA_VERSION=17".as_slice(), 0o644),
            ]),
        );
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        extract(&archive, ArchiveType::Tgz, &dest).unwrap();
        assert!(dest.join("jdk/bin/java").is_file());
        assert!(dest.join("jdk/release").is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("jdk/bin/java"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    fn tar_gz_raw_path(path: &[u8], data: &[u8], mode: u32) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.as_old_mut().name[..path.len()].copy_from_slice(path);
        header.set_cksum();
        builder.append(&header, data).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn rejects_parent_dir_entry() {
        let dir = tempdir().unwrap();
        let archive = write_archive(dir.path(), &tar_gz_raw_path(b"../evil", b"x", 0o644));
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let result = extract(&archive, ArchiveType::Tgz, &dest);
        assert!(matches!(result, Err(CjdkError::UnsafePath(_))));
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn rejects_escaping_symlink() {
        let dir = tempdir().unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_cksum();
        builder
            .append_link(&mut header, "jdk/link", "../../outside")
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        let archive = write_archive(dir.path(), &bytes);
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let result = extract(&archive, ArchiveType::Tgz, &dest);
        assert!(matches!(result, Err(CjdkError::UnsafePath(_))));
    }

    #[test]
    fn allows_internal_symlink() {
        let dir = tempdir().unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk/lib/real", b"data".as_slice())
            .unwrap();
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_cksum();
        builder
            .append_link(&mut header, "jdk/bin/link", "../lib/real")
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        let archive = write_archive(dir.path(), &bytes);
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        extract(&archive, ArchiveType::Tgz, &dest).unwrap();
        #[cfg(unix)]
        assert!(dest.join("jdk/bin/link").symlink_metadata().is_ok());
    }

    #[test]
    fn extracts_zip_entries() {
        let dir = tempdir().unwrap();
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            writer
                .start_file(
                    "jdk/bin/java.exe",
                    zip::write::SimpleFileOptions::default(),
                )
                .unwrap();
            writer.write_all(b"MZ").unwrap();
            writer.finish().unwrap();
        }
        let archive = write_archive(dir.path(), &buf);
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        extract(&archive, ArchiveType::Zip, &dest).unwrap();
        assert_eq!(fs::read(dest.join("jdk/bin/java.exe")).unwrap(), b"MZ");
    }

    #[test]
    fn rejects_zip_parent_dir_entry() {
        let dir = tempdir().unwrap();
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            writer
                .start_file("../evil", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"x").unwrap();
            writer.finish().unwrap();
        }
        let archive = write_archive(dir.path(), &buf);
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let result = extract(&archive, ArchiveType::Zip, &dest);
        assert!(matches!(result, Err(CjdkError::UnsafePath(_))));
    }

    #[test]
    fn lift_root_lifts_single_directory() {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("jdk-17.0.3+7/bin")).unwrap();
        fs::write(tree.join("jdk-17.0.3+7/bin/java"), b"java").unwrap();

        let root = lift_root(&tree).unwrap();
        assert_eq!(root, tree.join("jdk-17.0.3+7"));
    }

    #[test]
    fn lift_root_keeps_multiple_entries() {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("a")).unwrap();
        fs::create_dir_all(tree.join("b")).unwrap();

        let root = lift_root(&tree).unwrap();
        assert_eq!(root, tree);
    }

    #[test]
    fn lift_root_keeps_single_file() {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("file.txt"), b"data").unwrap();

        let root = lift_root(&tree).unwrap();
        assert_eq!(root, tree);
    }
}
