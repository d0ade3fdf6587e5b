use easybox_core::{validate_app_name, ApplicationDescriptor};
use easybox_security::sha256_file_hex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::exec::CommandExecutor;
use crate::extract::ArchiveExtractor;
use crate::fetch::ArtifactFetcher;
use crate::fs_utils::{remove_file_if_exists, write_file_atomic};
use crate::lock::AppLock;
use crate::manifest_store::ManifestStore;
use crate::metadata::{AppMetadata, MetadataStore};
use crate::versioner::{ContentVersioner, VersionCheck, VersionCheckError};
use crate::{
    ArtifactChange, CommandRun, EngineConfig, InstallPlan, InstallReport, LifecycleError,
    RollbackReport,
};

/// External capabilities the engine drives but does not implement.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn ArtifactFetcher,
    pub extractor: &'a dyn ArchiveExtractor,
    pub executor: &'a dyn CommandExecutor,
}

pub struct LifecycleEngine<'a> {
    config: EngineConfig,
    manifests: ManifestStore,
    metadata: MetadataStore,
    collaborators: Collaborators<'a>,
}

impl<'a> LifecycleEngine<'a> {
    pub fn new(config: EngineConfig, collaborators: Collaborators<'a>) -> Self {
        Self {
            manifests: ManifestStore::new(&config.manifest_path),
            metadata: MetadataStore::new(&config.metadata_dir),
            config,
            collaborators,
        }
    }

    /// Describes what `install` would do without touching any state.
    pub fn plan_install(&self, name: &str, args: &[String]) -> Result<InstallPlan, LifecycleError> {
        let descriptor = self.manifests.find_by_name(name)?;
        Ok(InstallPlan {
            name: descriptor.name.clone(),
            dependencies: descriptor.dependencies.clone(),
            artifact_locator: descriptor.artifact_locator.clone(),
            artifact_path: self
                .config
                .artifact_path(&descriptor.name, descriptor.archive_type()),
            install_dir: self.config.install_dir.clone(),
            start_command: descriptor.command_line(args),
        })
    }

    /// Installs or updates `name` if its remote artifact changed, then runs
    /// its start command with `args` appended.
    pub fn install(&self, name: &str, args: &[String]) -> Result<InstallReport, LifecycleError> {
        let descriptor = self.manifests.find_by_name(name)?;
        let _lock = self.lock(name)?;

        let artifact_path = self
            .config
            .artifact_path(&descriptor.name, descriptor.archive_type());
        let check = match self.cached_artifact(name, &artifact_path) {
            None => VersionCheck::FirstInstall,
            Some(cached) if cached != artifact_path => {
                debug!(app = name, cached = %cached.display(), "archive type changed; reinstalling");
                VersionCheck::Changed {
                    payload: self.fetch(&descriptor)?,
                }
            }
            Some(_) if !self.has_record(name)? => {
                debug!(app = name, "cached artifact has no metadata record; reinstalling");
                VersionCheck::Changed {
                    payload: self.fetch(&descriptor)?,
                }
            }
            Some(cached) => ContentVersioner::new(self.collaborators.fetcher)
                .check(&cached, &descriptor.artifact_locator)
                .map_err(|err| match err {
                    VersionCheckError::Fetch(source) => LifecycleError::Fetch {
                        name: name.to_string(),
                        locator: descriptor.artifact_locator.clone(),
                        source,
                    },
                    VersionCheckError::Local(source) => LifecycleError::Storage {
                        name: name.to_string(),
                        action: "hash cached artifact",
                        source,
                    },
                })?,
        };

        let mut dependency_runs = Vec::new();
        let (change, version) = match check {
            VersionCheck::Unchanged { digest } => {
                info!(app = name, version = %digest, "artifact unchanged; skipping reinstall");
                (ArtifactChange::Unchanged, digest)
            }
            VersionCheck::FirstInstall => {
                dependency_runs = self.run_dependencies(&descriptor);
                let payload = self.fetch(&descriptor)?;
                let version = self.apply_artifact(&descriptor, &payload)?;
                (ArtifactChange::Installed, version)
            }
            VersionCheck::Changed { payload } => {
                dependency_runs = self.run_dependencies(&descriptor);
                let version = self.apply_artifact(&descriptor, &payload)?;
                (ArtifactChange::Updated, version)
            }
        };

        let mut recorded_runs = None;
        let start_run = match descriptor.command_line(args) {
            Some(command_line) => {
                let run = self.run_command("start", &command_line);
                recorded_runs = self.record_run(name)?;
                Some(run)
            }
            None => None,
        };

        Ok(InstallReport {
            name: descriptor.name,
            change,
            version,
            artifact_path,
            install_dir: self.config.install_dir.clone(),
            dependency_runs,
            start_run,
            recorded_runs,
        })
    }

    /// `install` without invocation arguments. Installs fresh when absent.
    pub fn update(&self, name: &str) -> Result<InstallReport, LifecycleError> {
        self.install(name, &[])
    }

    /// Removes the cached artifact and metadata record. Missing files are fine.
    pub fn rollback(&self, name: &str) -> Result<RollbackReport, LifecycleError> {
        validate_name(name)?;
        let _lock = self.lock(name)?;

        let mut removed_artifacts = Vec::new();
        for path in self.config.artifact_candidates(name) {
            let removed = remove_file_if_exists(&path).map_err(|err| LifecycleError::Storage {
                name: name.to_string(),
                action: "remove artifact",
                source: anyhow::Error::new(err)
                    .context(format!("failed to remove {}", path.display())),
            })?;
            if removed {
                removed_artifacts.push(path);
            }
        }

        let removed_metadata =
            self.metadata
                .delete(name)
                .map_err(|source| LifecycleError::Storage {
                    name: name.to_string(),
                    action: "remove metadata",
                    source,
                })?;

        info!(
            app = name,
            artifacts = removed_artifacts.len(),
            metadata = removed_metadata,
            "rolled back"
        );
        Ok(RollbackReport {
            name: name.to_string(),
            removed_artifacts,
            removed_metadata,
        })
    }

    pub fn list(&self) -> Result<BTreeSet<String>, LifecycleError> {
        self.metadata
            .list_all()
            .map_err(|source| LifecycleError::Storage {
                name: "*".to_string(),
                action: "list metadata",
                source,
            })
    }

    pub fn info(&self, name: &str) -> Result<AppMetadata, LifecycleError> {
        validate_name(name)?;
        self.metadata
            .get(name)
            .map_err(|source| LifecycleError::Storage {
                name: name.to_string(),
                action: "read metadata",
                source,
            })?
            .ok_or_else(|| LifecycleError::NotInstalled {
                name: name.to_string(),
            })
    }

    fn lock(&self, name: &str) -> Result<Option<AppLock>, LifecycleError> {
        match &self.config.locks_dir {
            Some(dir) => AppLock::acquire(dir, name).map(Some),
            None => Ok(None),
        }
    }

    /// The artifact file for `name` under the current archive type, or under
    /// any other known extension when the `RawLink` changed type.
    fn cached_artifact(&self, name: &str, preferred: &Path) -> Option<PathBuf> {
        if preferred.is_file() {
            return Some(preferred.to_path_buf());
        }
        self.config
            .artifact_candidates(name)
            .into_iter()
            .find(|path| path.is_file())
    }

    fn has_record(&self, name: &str) -> Result<bool, LifecycleError> {
        self.metadata
            .get(name)
            .map(|record| record.is_some())
            .map_err(|source| LifecycleError::Storage {
                name: name.to_string(),
                action: "read metadata",
                source,
            })
    }

    /// Keeps a single cached artifact per application.
    fn remove_stale_artifacts(&self, name: &str, keep: &Path) -> Result<(), LifecycleError> {
        for path in self.config.artifact_candidates(name) {
            if path == keep {
                continue;
            }
            let removed = remove_file_if_exists(&path).map_err(|err| LifecycleError::Storage {
                name: name.to_string(),
                action: "remove stale artifact",
                source: anyhow::Error::new(err)
                    .context(format!("failed to remove {}", path.display())),
            })?;
            if removed {
                debug!(app = name, artifact = %path.display(), "removed stale artifact");
            }
        }
        Ok(())
    }

    fn fetch(&self, descriptor: &ApplicationDescriptor) -> Result<Vec<u8>, LifecycleError> {
        info!(app = %descriptor.name, locator = %descriptor.artifact_locator, "fetching artifact");
        self.collaborators
            .fetcher
            .fetch(&descriptor.artifact_locator)
            .map_err(|source| LifecycleError::Fetch {
                name: descriptor.name.clone(),
                locator: descriptor.artifact_locator.clone(),
                source,
            })
    }

    /// Persists, extracts, then commits metadata. Metadata is written only
    /// after extraction succeeds.
    fn apply_artifact(
        &self,
        descriptor: &ApplicationDescriptor,
        payload: &[u8],
    ) -> Result<String, LifecycleError> {
        let name = descriptor.name.as_str();
        let archive_type = descriptor.archive_type();
        let artifact_path = self.config.artifact_path(name, archive_type);

        write_file_atomic(&artifact_path, payload).map_err(|source| LifecycleError::Storage {
            name: name.to_string(),
            action: "write artifact",
            source,
        })?;
        debug!(app = name, artifact = %artifact_path.display(), bytes = payload.len(), "wrote artifact");

        self.collaborators
            .extractor
            .extract(&artifact_path, archive_type, &self.config.install_dir)
            .map_err(|source| LifecycleError::Extract {
                name: name.to_string(),
                archive: artifact_path.clone(),
                target: self.config.install_dir.clone(),
                source,
            })?;

        let version = sha256_file_hex(&artifact_path).map_err(|source| LifecycleError::Storage {
            name: name.to_string(),
            action: "hash artifact",
            source,
        })?;
        self.metadata
            .save(name, &version)
            .map_err(|source| LifecycleError::Storage {
                name: name.to_string(),
                action: "save metadata",
                source,
            })?;
        self.remove_stale_artifacts(name, &artifact_path)?;

        info!(app = name, %version, install_dir = %self.config.install_dir.display(), "installed artifact");
        Ok(version)
    }

    fn run_dependencies(&self, descriptor: &ApplicationDescriptor) -> Vec<CommandRun> {
        descriptor
            .dependencies
            .iter()
            .map(|dependency| self.run_command("dependency", dependency))
            .collect()
    }

    /// Exit codes are reported, never fatal.
    fn run_command(&self, step: &'static str, command_line: &str) -> CommandRun {
        info!(step, command = command_line, "running command");
        let exit_code = match self.collaborators.executor.execute(command_line) {
            Ok(Some(0)) => Some(0),
            Ok(Some(code)) => {
                warn!(step, command = command_line, code, "command exited with non-zero status");
                Some(code)
            }
            Ok(None) => {
                warn!(step, command = command_line, "command terminated without an exit code");
                None
            }
            Err(err) => {
                warn!(step, command = command_line, error = %format!("{err:#}"), "command failed to start");
                None
            }
        };

        CommandRun {
            command: command_line.to_string(),
            exit_code,
        }
    }

    fn record_run(&self, name: &str) -> Result<Option<usize>, LifecycleError> {
        let record = self
            .metadata
            .append_run(name)
            .map_err(|source| LifecycleError::Storage {
                name: name.to_string(),
                action: "record run",
                source,
            })?;
        match record {
            Some(record) => Ok(Some(record.runs.len())),
            None => {
                warn!(
                    app = name,
                    "no metadata record to append the run to; run rollback and reinstall to repair"
                );
                Ok(None)
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), LifecycleError> {
    validate_app_name(name).map_err(|source| LifecycleError::InvalidName {
        name: name.to_string(),
        source,
    })
}
