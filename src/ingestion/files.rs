use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| Error::Ingestion(format!("bad file pattern {p:?}: {e}")))
        })
        .collect()
}

/// Files anywhere under `base` whose name matches `include` but not `exclude`.
///
/// Patterns apply to file names only, never to directories. A missing `base`
/// yields an empty set.
pub fn find_matching_files(
    base: &Path,
    include: &[String],
    exclude: &[String],
) -> Result<BTreeSet<PathBuf>> {
    let include = compile(include)?;
    let exclude = compile(exclude)?;

    let mut files = BTreeSet::new();
    if !base.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(base).follow_links(true) {
        let entry =
            entry.map_err(|e| Error::Ingestion(format!("cannot scan {}: {e}", base.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if include.iter().any(|p| p.matches(&name)) && !exclude.iter().any(|p| p.matches(&name))
        {
            files.insert(entry.into_path());
        }
    }
    Ok(files)
}
