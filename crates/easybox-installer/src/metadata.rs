use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fs_utils::{remove_file_if_exists, write_file_atomic};

const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub installed_at: u64,
    /// SHA-256 of the installed artifact.
    pub version: String,
    #[serde(default)]
    pub runs: Vec<u64>,
}

/// One JSON record per installed application.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORD_EXTENSION}"))
    }

    /// Replaces any existing record; run history starts empty.
    pub fn save(&self, name: &str, version: &str) -> Result<AppMetadata> {
        let record = AppMetadata {
            name: name.to_string(),
            installed_at: current_unix_timestamp()?,
            version: version.to_string(),
            runs: Vec::new(),
        };
        self.write_record(&record)?;
        Ok(record)
    }

    /// Appends the current time to the run history. `None` when no record exists.
    pub fn append_run(&self, name: &str) -> Result<Option<AppMetadata>> {
        let Some(mut record) = self.get(name)? else {
            return Ok(None);
        };

        let now = current_unix_timestamp()?;
        let last = record.runs.last().copied().unwrap_or(0);
        record.runs.push(now.max(last));
        self.write_record(&record)?;
        Ok(Some(record))
    }

    pub fn get(&self, name: &str) -> Result<Option<AppMetadata>> {
        let path = self.record_path(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read metadata: {}", path.display()));
            }
        };
        let record = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse metadata: {}", path.display()))?;
        Ok(Some(record))
    }

    pub fn list_all(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read metadata directory: {}", self.dir.display())
                });
            }
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|v| v.to_str()) {
                names.insert(stem.to_string());
            }
        }

        Ok(names)
    }

    /// Returns whether a record was removed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.record_path(name);
        remove_file_if_exists(&path)
            .with_context(|| format!("failed to remove metadata: {}", path.display()))
    }

    pub(crate) fn write_record(&self, record: &AppMetadata) -> Result<()> {
        let path = self.record_path(&record.name);
        let mut payload = serde_json::to_string_pretty(record)
            .with_context(|| format!("failed to serialize metadata: {}", path.display()))?;
        payload.push('\n');
        write_file_atomic(&path, payload.as_bytes())
    }
}

pub(crate) fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}
