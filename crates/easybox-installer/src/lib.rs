mod engine;
mod error;
mod exec;
mod extract;
mod fetch;
mod fs_utils;
mod layout;
mod lock;
mod manifest_store;
mod metadata;
mod types;
mod versioner;

pub use engine::{Collaborators, LifecycleEngine};
pub use error::LifecycleError;
pub use exec::{CommandExecutor, ShellExecutor};
pub use extract::{ArchiveExtractor, SystemExtractor};
pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use layout::{EngineConfig, StateLayout};
pub use lock::AppLock;
pub use manifest_store::ManifestStore;
pub use metadata::{AppMetadata, MetadataStore};
pub use types::{ArtifactChange, CommandRun, InstallPlan, InstallReport, RollbackReport};
pub use versioner::{ContentVersioner, VersionCheck, VersionCheckError};
