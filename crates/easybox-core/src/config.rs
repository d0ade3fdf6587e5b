use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "easybox_config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EasyboxConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

impl EasyboxConfig {
    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        serde_json::from_str(input).context("failed to parse easybox config")
    }

    /// Reads the config file, returning defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config: {}", path.display()));
            }
        };
        Self::from_json_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Directory archives are extracted into. Relative paths resolve against `root`.
    pub fn install_dir(&self, root: &Path) -> PathBuf {
        match &self.install_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root.join(path),
            None => root.to_path_buf(),
        }
    }
}
