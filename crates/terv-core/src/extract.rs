//! Archive extraction into a version directory.
//!
//! Extraction always runs on bytes that already passed verification, so
//! everything works from memory. Paths are sanitized against Zip Slip and
//! the expected executable is forced to mode 0755 even when the archive
//! was built without unix modes.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{Result, TervError};

/// Unpack a zip archive into `target_dir`, marking `exec_name` executable.
pub fn unzip_to_dir(data: &[u8], target_dir: &Path, exec_name: &str) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    fs::create_dir_all(target_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative_path) = entry.enclosed_name() else {
            return Err(TervError::Archive(format!(
                "unsafe path in archive: {}",
                entry.name()
            )));
        };

        if entry.is_dir() {
            fs::create_dir_all(target_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = target_dir.join(&relative_path);
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut outfile)?;
        drop(outfile);

        set_mode(&absolute_path, &relative_path, entry.unix_mode(), exec_name)?;
    }
    Ok(())
}

/// Unpack a gzipped tarball into `target_dir`, marking `exec_name`
/// executable.
pub fn untar_gz_to_dir(data: &[u8], target_dir: &Path, exec_name: &str) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let decoder = flate2::read::GzDecoder::new(Cursor::new(data));
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let entry_path = entry.path()?.into_owned();
        let relative_path = sanitized_relative_path(&entry_path)?;
        let absolute_path = target_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&absolute_path)?;

        set_mode(
            &absolute_path,
            &relative_path,
            entry.header().mode().ok(),
            exec_name,
        )?;
    }
    Ok(())
}

/// Write a raw downloaded binary as `exec_name` under `target_dir`.
pub fn write_binary(data: &[u8], target_dir: &Path, exec_name: &str) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    let path = target_dir.join(exec_name);
    fs::write(&path, data)?;
    make_executable(&path)?;
    Ok(())
}

/// Keep only normal components, rejecting anything (`..`, a root, a
/// prefix) that could step outside the target directory.
fn sanitized_relative_path(entry_path: &Path) -> Result<PathBuf> {
    use std::path::Component;

    let mut relative_path = PathBuf::new();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => relative_path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TervError::Archive(format!(
                    "unsafe path in archive: {}",
                    entry_path.display()
                )));
            }
        }
    }
    Ok(relative_path)
}

fn set_mode(
    absolute_path: &Path,
    relative_path: &Path,
    archive_mode: Option<u32>,
    exec_name: &str,
) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = archive_mode {
            fs::set_permissions(absolute_path, fs::Permissions::from_mode(mode))?;
        }
        // zips built on windows carry no unix mode
        if relative_path.file_name().and_then(|n| n.to_str()) == Some(exec_name) {
            make_executable(absolute_path)?;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (absolute_path, relative_path, archive_mode, exec_name);
    }
    Ok(())
}

fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn sample_zip() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("tofu", options).unwrap();
            writer.write_all(b"#!/bin/sh\necho tofu\n").unwrap();
            writer.start_file("LICENSE", options).unwrap();
            writer.write_all(b"license text").unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn tar_gz_with_entry(name: &str, content: &[u8]) -> Vec<u8> {
        let mut tarball = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tarball);
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            // Write the name bytes directly: `set_path`/`append_data` refuse
            // `..` components, which the rejection test needs in its fixture.
            header.as_gnu_mut().unwrap().name[..name.len()]
                .copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder.append(&header, content).unwrap();
            builder.finish().unwrap();
        }
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tarball).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn unzips_and_marks_binary_executable() {
        let dir = tempdir().unwrap();
        unzip_to_dir(&sample_zip(), dir.path(), "tofu").unwrap();

        let binary = dir.path().join("tofu");
        assert!(binary.exists());
        assert!(dir.path().join("LICENSE").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&binary).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn untars_and_marks_binary_executable() {
        let dir = tempdir().unwrap();
        let data = tar_gz_with_entry("terramate", b"hello");
        untar_gz_to_dir(&data, dir.path(), "terramate").unwrap();

        let binary = dir.path().join("terramate");
        assert_eq!(fs::read(&binary).unwrap(), b"hello");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&binary).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn writes_raw_binary() {
        let dir = tempdir().unwrap();
        write_binary(b"raw", dir.path(), "terragrunt").unwrap();
        assert_eq!(fs::read(dir.path().join("terragrunt")).unwrap(), b"raw");
    }

    #[test]
    fn corrupt_zip_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(unzip_to_dir(b"not a zip", dir.path(), "tofu").is_err());
    }

    #[test]
    fn tar_parent_dir_entry_is_rejected() {
        let parent = tempdir().unwrap();
        let target = parent.path().join("target");
        fs::create_dir_all(&target).unwrap();

        let data = tar_gz_with_entry("../escaped.txt", b"oops");
        let err = untar_gz_to_dir(&data, &target, "terramate").unwrap_err();
        assert!(matches!(err, TervError::Archive(_)));
        assert!(!parent.path().join("escaped.txt").exists());
    }
}
