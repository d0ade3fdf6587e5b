use anyhow::{Context, Result};
use easybox_core::{validate_app_name, AppManifest, ApplicationDescriptor, EMPTY_MANIFEST};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::LifecycleError;

#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads every descriptor in file order, creating an empty manifest on first use.
    pub fn load_manifest(&self) -> Result<AppManifest, LifecycleError> {
        self.read_or_bootstrap()
            .map_err(|source| LifecycleError::Manifest {
                path: self.path.clone(),
                source,
            })
    }

    pub fn find_by_name(&self, name: &str) -> Result<ApplicationDescriptor, LifecycleError> {
        validate_app_name(name).map_err(|source| LifecycleError::InvalidName {
            name: name.to_string(),
            source,
        })?;

        let manifest = self.load_manifest()?;
        let duplicates = manifest.duplicate_names();
        if duplicates.iter().any(|duplicate| duplicate == name) {
            warn!(
                app = name,
                manifest = %self.path.display(),
                "manifest declares this application more than once; using the first entry"
            );
        }

        manifest
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| LifecycleError::AppNotFound {
                name: name.to_string(),
            })
    }

    fn read_or_bootstrap(&self) -> Result<AppManifest> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.bootstrap()?;
                return Ok(AppManifest::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read manifest: {}", self.path.display()));
            }
        };

        let manifest = AppManifest::from_toml_str(&raw)?;
        debug!(
            manifest = %self.path.display(),
            applications = manifest.applications.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    fn bootstrap(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            // Another invocation created it between our read and this open.
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to create manifest: {}", self.path.display())
                });
            }
        };
        file.write_all(EMPTY_MANIFEST.as_bytes())
            .with_context(|| format!("failed to write manifest: {}", self.path.display()))?;

        info!(manifest = %self.path.display(), "created empty manifest");
        Ok(())
    }
}
