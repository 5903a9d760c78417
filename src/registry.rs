//! Checksum registry
//!
//! Writes a `<relative path> <sha256>` line for every file of the corpus, the
//! format test suites use to look up and verify cached data files.

use crate::errors::Result;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// SHA-256 of a file's content as lower-case hex.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Relative path with `/` separators on every platform.
fn registry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hash every file under `directory` and write the registry to `output`.
///
/// Entries are sorted by relative path. The registry file itself is skipped
/// when it lives inside `directory`. Returns the number of entries written.
pub fn make_registry(directory: &Path, output: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(directory, &mut files)?;

    let output_abs = fs::canonicalize(output).ok();
    let mut entries: Vec<(String, PathBuf)> = files
        .into_iter()
        .filter(|path| output_abs.is_none() || fs::canonicalize(path).ok() != output_abs)
        .map(|path| (registry_name(directory, &path), path))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(output)?);
    for (name, path) in &entries {
        writeln!(writer, "{} {}", name, file_hash(path)?)?;
    }
    writer.flush()?;

    info!(
        "Wrote {} registry entries to {}",
        entries.len(),
        output.display()
    );
    Ok(entries.len())
}
