use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactChange {
    /// No artifact was cached before this run.
    Installed,
    /// The remote payload differed from the cached artifact.
    Updated,
    Unchanged,
}

/// An executed command line and its exit code, when one was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRun {
    pub command: String,
    pub exit_code: Option<i32>,
}

impl CommandRun {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub name: String,
    pub dependencies: Vec<String>,
    pub artifact_locator: String,
    pub artifact_path: PathBuf,
    pub install_dir: PathBuf,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub name: String,
    pub change: ArtifactChange,
    pub version: String,
    pub artifact_path: PathBuf,
    pub install_dir: PathBuf,
    pub dependency_runs: Vec<CommandRun>,
    pub start_run: Option<CommandRun>,
    /// Length of the run history after the start command was recorded.
    pub recorded_runs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub name: String,
    pub removed_artifacts: Vec<PathBuf>,
    pub removed_metadata: bool,
}

impl RollbackReport {
    pub fn removed_anything(&self) -> bool {
        !self.removed_artifacts.is_empty() || self.removed_metadata
    }
}
