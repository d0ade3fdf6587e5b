use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to load manifest {}", .path.display())]
    Manifest {
        path: PathBuf,
        source: anyhow::Error,
    },
    #[error("application '{name}' not found in manifest")]
    AppNotFound { name: String },
    #[error("application '{name}' is not installed")]
    NotInstalled { name: String },
    #[error("invalid application name '{name}'")]
    InvalidName {
        name: String,
        source: anyhow::Error,
    },
    #[error("failed to fetch artifact for '{name}' from {locator}")]
    Fetch {
        name: String,
        locator: String,
        source: anyhow::Error,
    },
    #[error(
        "failed to extract {} into {}; the artifact was written but no metadata was saved, run `easybox rollback {name}` to reset",
        .archive.display(),
        .target.display()
    )]
    Extract {
        name: String,
        archive: PathBuf,
        target: PathBuf,
        source: anyhow::Error,
    },
    #[error(
        "another easybox operation holds the lock for '{name}' ({}); remove it if no other easybox process is running",
        .path.display()
    )]
    Locked { name: String, path: PathBuf },
    #[error("failed to {action} for '{name}'")]
    Storage {
        name: String,
        action: &'static str,
        source: anyhow::Error,
    },
}

impl LifecycleError {
    /// Short label for the step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Manifest { .. } => "manifest",
            Self::AppNotFound { .. } | Self::NotInstalled { .. } => "lookup",
            Self::InvalidName { .. } => "validate",
            Self::Fetch { .. } => "fetch",
            Self::Extract { .. } => "extract",
            Self::Locked { .. } => "lock",
            Self::Storage { .. } => "persist",
        }
    }
}
