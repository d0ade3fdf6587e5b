use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Retrieves a payload for a locator.
pub trait ArtifactFetcher {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Fetches `http(s)://` locators with reqwest; `file://` locators and bare
/// paths are read from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("easybox/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        if let Some(path) = local_locator_path(locator) {
            return fs::read(path)
                .with_context(|| format!("failed to read local artifact: {}", path.display()));
        }

        let response = self
            .client
            .get(locator)
            .send()
            .with_context(|| format!("request failed: {locator}"))?
            .error_for_status()
            .with_context(|| format!("server rejected request: {locator}"))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("failed reading response body: {locator}"))?;
        Ok(bytes.to_vec())
    }
}

pub(crate) fn local_locator_path(locator: &str) -> Option<&Path> {
    if let Some(path) = locator.strip_prefix("file://") {
        return Some(Path::new(path));
    }
    if locator.contains("://") {
        return None;
    }
    Some(Path::new(locator))
}
