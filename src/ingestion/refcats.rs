use flate2::read::GzDecoder;
use std::fs;
use std::path::{Component, Path};
use tar::{Archive, EntryType};

use crate::{Error, Result};

fn validate_relative_path(path: &Path) -> Result<()> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(Error::Ingestion(format!(
                    "refcat archive entry escapes its directory: {}",
                    path.display()
                )))
            }
        }
    }
    Ok(())
}

fn open_archive(tarball: &Path) -> Result<Archive<GzDecoder<fs::File>>> {
    let file = fs::File::open(tarball).map_err(|e| Error::io(tarball, e))?;
    Ok(Archive::new(GzDecoder::new(file)))
}

/// Reject the archive if any entry is unsupported or escapes its directory.
fn check_entries(tarball: &Path) -> Result<()> {
    let read_error = |e: std::io::Error| Error::io(tarball, e);
    let mut archive = open_archive(tarball)?;

    for entry in archive.entries().map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        match entry.header().entry_type() {
            EntryType::Directory | EntryType::Regular => {}
            _ => {
                return Err(Error::Ingestion(format!(
                    "{} contains an unsupported entry type",
                    tarball.display()
                )))
            }
        }
        validate_relative_path(&entry.path().map_err(read_error)?)?;
    }
    Ok(())
}

/// Unpack a gzipped tarball of refcat shards into `dest_dir`.
///
/// Only regular files and directories are accepted, and every entry must
/// stay inside `dest_dir`. The whole archive is checked before anything is
/// written, so a rejected archive leaves `dest_dir` untouched.
pub fn extract_refcat(tarball: &Path, dest_dir: &Path) -> Result<()> {
    check_entries(tarball)?;

    let read_error = |e: std::io::Error| Error::io(tarball, e);
    let mut archive = open_archive(tarball)?;
    fs::create_dir_all(dest_dir).map_err(|e| Error::io(dest_dir, e))?;

    for entry in archive.entries().map_err(read_error)? {
        let mut entry = entry.map_err(read_error)?;
        let path = entry.path().map_err(read_error)?.into_owned();
        let dest_path = dest_dir.join(&path);

        if entry.header().entry_type() == EntryType::Directory {
            fs::create_dir_all(&dest_path).map_err(|e| Error::io(&dest_path, e))?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            entry
                .unpack(&dest_path)
                .map_err(|e| Error::io(&dest_path, e))?;
        }
    }
    Ok(())
}
