//! Sequence extraction from companion annotation formats.

pub mod goi;
pub mod mfannot;

use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Output path derived from an input path: the file name up to its first
/// `.`, followed by `suffix`, in the input's directory.
pub fn derived_output(input: &Path, suffix: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or("");
    input.with_file_name(format!("{}{}", stem, suffix))
}

/// Write a file through a temporary sibling so readers never see a partial file.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let staged = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(staged.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    staged
        .persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
