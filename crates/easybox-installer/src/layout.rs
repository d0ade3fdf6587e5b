use anyhow::{Context, Result};
use easybox_core::{ArchiveType, EasyboxConfig, CONFIG_FILE_NAME};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk state rooted at a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("easybox.toml")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("installed_apps")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("app_metadata")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.artifacts_dir(), self.metadata_dir(), self.locks_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Every path the lifecycle engine touches, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub manifest_path: PathBuf,
    pub artifacts_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub install_dir: PathBuf,
    /// Per-application advisory locks are taken only when this is set.
    pub locks_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_layout(layout: &StateLayout, config: &EasyboxConfig) -> Self {
        Self {
            manifest_path: layout.manifest_path(),
            artifacts_dir: layout.artifacts_dir(),
            metadata_dir: layout.metadata_dir(),
            install_dir: config.install_dir(layout.root()),
            locks_dir: Some(layout.locks_dir()),
        }
    }

    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = install_dir.into();
        self
    }

    pub fn without_locking(mut self) -> Self {
        self.locks_dir = None;
        self
    }

    pub fn artifact_path(&self, name: &str, archive_type: ArchiveType) -> PathBuf {
        self.artifacts_dir
            .join(format!("{name}.{}", archive_type.as_str()))
    }

    /// Every artifact file name an application could have been cached under.
    pub fn artifact_candidates(&self, name: &str) -> Vec<PathBuf> {
        ArchiveType::ALL
            .iter()
            .map(|archive_type| self.artifact_path(name, *archive_type))
            .collect()
    }
}
