use std::collections::HashSet;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Deserializer, Serialize};

use crate::archive::ArchiveType;

/// Contents written when the manifest file does not exist yet.
pub const EMPTY_MANIFEST: &str = "\
# easybox application manifest
#
# [[application]]
# Name = \"tool\"
# Dependencies = \"apt-get install -y jq, pip install requests\"
# RawLink = \"https://example.test/tool.tar.gz\"
# StartCMD = \"./tool/run.sh\"
";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppManifest {
    #[serde(default, rename = "application")]
    pub applications: Vec<ApplicationDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(
        rename = "Dependencies",
        default,
        deserialize_with = "deserialize_dependencies"
    )]
    pub dependencies: Vec<String>,
    #[serde(rename = "RawLink")]
    pub artifact_locator: String,
    #[serde(rename = "StartCMD", default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependencies {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_dependencies<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match RawDependencies::deserialize(deserializer)? {
        RawDependencies::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        RawDependencies::List(list) => list
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    };
    Ok(entries)
}

impl AppManifest {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let mut manifest: Self =
            toml::from_str(input).context("failed to parse easybox manifest")?;

        for (index, app) in manifest.applications.iter_mut().enumerate() {
            validate_app_name(&app.name)
                .with_context(|| format!("invalid application entry #{}", index + 1))?;
            if app.artifact_locator.trim().is_empty() {
                return Err(anyhow!(
                    "application '{}' must declare a non-empty RawLink",
                    app.name
                ));
            }
            if app
                .start_command
                .as_deref()
                .is_some_and(|command| command.trim().is_empty())
            {
                app.start_command = None;
            }
        }

        Ok(manifest)
    }

    /// First entry whose name matches exactly; later duplicates are shadowed.
    pub fn find_by_name(&self, name: &str) -> Option<&ApplicationDescriptor> {
        self.applications.iter().find(|app| app.name == name)
    }

    /// Names declared more than once, in first-seen order.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for app in &self.applications {
            if !seen.insert(app.name.as_str()) && reported.insert(app.name.as_str()) {
                duplicates.push(app.name.clone());
            }
        }
        duplicates
    }
}

impl ApplicationDescriptor {
    pub fn archive_type(&self) -> ArchiveType {
        ArchiveType::for_locator(&self.artifact_locator)
    }

    /// Start command with the invocation arguments appended, if one is configured.
    pub fn command_line(&self, args: &[String]) -> Option<String> {
        let start = self.start_command.as_deref()?.trim();
        if args.is_empty() {
            return Some(start.to_string());
        }
        Some(format!("{start} {}", args.join(" ")))
    }
}

pub fn validate_app_name(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("application name must not be empty"));
    }
    if name.trim() != name {
        return Err(anyhow!(
            "application name must not have surrounding whitespace: '{name}'"
        ));
    }
    if name == "." || name == ".." {
        return Err(anyhow!("application name must not be '{name}'"));
    }
    if name
        .chars()
        .any(|ch| ch == '/' || ch == '\\' || ch == '\0' || ch.is_control())
    {
        return Err(anyhow!(
            "application name contains a path separator or control character: '{name}'"
        ));
    }
    Ok(())
}
