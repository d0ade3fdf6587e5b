use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Returns whether a file was removed.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Writes `bytes` to a sibling `.part` file and renames it over `path`.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let part_path = path.with_file_name(format!(
        "{}.part",
        path.file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("easybox")
    ));

    if let Err(err) = fs::write(&part_path, bytes) {
        let _ = fs::remove_file(&part_path);
        return Err(err).with_context(|| format!("failed to write {}", part_path.display()));
    }

    fs::rename(&part_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            part_path.display(),
            path.display()
        )
    })
}
