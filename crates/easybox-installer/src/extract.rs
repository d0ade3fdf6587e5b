use anyhow::{anyhow, Context, Result};
use easybox_core::ArchiveType;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Unpacks a cached artifact into a target directory.
pub trait ArchiveExtractor {
    fn extract(&self, archive_path: &Path, archive_type: ArchiveType, target_dir: &Path)
        -> Result<()>;
}

/// Delegates to the host `tar` and `unzip` tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExtractor;

impl ArchiveExtractor for SystemExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        archive_type: ArchiveType,
        target_dir: &Path,
    ) -> Result<()> {
        fs::create_dir_all(target_dir)
            .with_context(|| format!("failed to create {}", target_dir.display()))?;

        match archive_type {
            ArchiveType::TarGz | ArchiveType::TarZst => extract_tar(archive_path, target_dir),
            ArchiveType::Zip => extract_zip(archive_path, target_dir),
        }
    }
}

fn extract_tar(archive_path: &Path, dst: &Path) -> Result<()> {
    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract tar archive",
    )
}

fn extract_zip(archive_path: &Path, dst: &Path) -> Result<()> {
    let mut unzip_command = Command::new("unzip");
    unzip_command
        .arg("-q")
        .arg("-o")
        .arg(archive_path)
        .arg("-d")
        .arg(dst);
    if run_command(
        &mut unzip_command,
        "failed to extract zip archive with unzip",
    )
    .is_ok()
    {
        return Ok(());
    }

    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract zip archive with tar",
    )
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}
