use anyhow::Context;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::LifecycleError;

/// Advisory per-application lock held for one install, update or rollback.
/// The lock file is removed when the guard drops.
#[derive(Debug)]
pub struct AppLock {
    path: PathBuf,
}

impl AppLock {
    pub fn acquire(locks_dir: &Path, name: &str) -> Result<Self, LifecycleError> {
        let path = locks_dir.join(format!("{name}.lock"));
        claim_lock_file(&path).map_err(|err| match err {
            ClaimError::Held => LifecycleError::Locked {
                name: name.to_string(),
                path: path.clone(),
            },
            ClaimError::Io(source) => LifecycleError::Storage {
                name: name.to_string(),
                action: "acquire lock",
                source,
            },
        })?;
        Ok(Self { path })
    }
}

impl Drop for AppLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

enum ClaimError {
    Held,
    Io(anyhow::Error),
}

fn claim_lock_file(path: &Path) -> Result<(), ClaimError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))
            .map_err(ClaimError::Io)?;
    }

    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Err(ClaimError::Held),
        Err(err) => {
            return Err(ClaimError::Io(anyhow::Error::new(err).context(format!(
                "failed to claim lock file: {}",
                path.display()
            ))));
        }
    };

    if let Err(err) = file.write_all(format!("{}\n", std::process::id()).as_bytes()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(ClaimError::Io(anyhow::Error::new(err).context(format!(
            "failed to write lock file: {}",
            path.display()
        ))));
    }
    Ok(())
}
