use easybox_security::{sha256_file_hex, sha256_hex};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::fetch::ArtifactFetcher;

/// Outcome of comparing a cached artifact against its remote payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Nothing cached yet; the remote was not contacted.
    FirstInstall,
    /// The remote digest differs. Carries the payload that was downloaded.
    Changed { payload: Vec<u8> },
    Unchanged { digest: String },
}

impl VersionCheck {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

#[derive(Debug, Error)]
pub enum VersionCheckError {
    #[error("failed to fetch remote artifact")]
    Fetch(#[source] anyhow::Error),
    #[error("failed to hash cached artifact")]
    Local(#[source] anyhow::Error),
}

pub struct ContentVersioner<'a> {
    fetcher: &'a dyn ArtifactFetcher,
}

impl<'a> ContentVersioner<'a> {
    pub fn new(fetcher: &'a dyn ArtifactFetcher) -> Self {
        Self { fetcher }
    }

    pub fn digest(bytes: &[u8]) -> String {
        sha256_hex(bytes)
    }

    pub fn has_changed(&self, local_path: &Path, locator: &str) -> Result<bool, VersionCheckError> {
        Ok(self.check(local_path, locator)?.is_changed())
    }

    /// Downloads the full remote payload whenever a local artifact exists.
    pub fn check(&self, local_path: &Path, locator: &str) -> Result<VersionCheck, VersionCheckError> {
        if !local_path.is_file() {
            debug!(artifact = %local_path.display(), "no cached artifact");
            return Ok(VersionCheck::FirstInstall);
        }

        let payload = self
            .fetcher
            .fetch(locator)
            .map_err(VersionCheckError::Fetch)?;
        let remote = Self::digest(&payload);
        let local = sha256_file_hex(local_path).map_err(VersionCheckError::Local)?;
        debug!(%remote, %local, "compared artifact digests");

        if remote == local {
            Ok(VersionCheck::Unchanged { digest: local })
        } else {
            Ok(VersionCheck::Changed { payload })
        }
    }
}
