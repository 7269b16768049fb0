//! Scoped working-directory changes.
//!
//! The process working directory is global state; every change goes through
//! [`CwdGuard`] so the previous directory comes back on every exit path,
//! including `?` early returns and unwinding.

use crate::log;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Restores the previous working directory when dropped.
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub struct CwdGuard {
    previous: PathBuf,
    label: String,
}

impl CwdGuard {
    /// Change into `dir`, remembering the current directory.
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = std::env::current_dir().context("Failed to get current working directory")?;
        let label = display_name(dir);

        log!("cd"; "entering {label}/");
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to enter `{}`", dir.display()))?;

        Ok(Self { previous, label })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        log!("cd"; "leaving {}/", self.label);
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            log!("error"; "failed to restore `{}`: {}", self.previous.display(), e);
        }
    }
}

/// Run `f` with `dir` as working directory, restoring it afterwards.
pub fn with_dir<T>(dir: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = CwdGuard::enter(dir)?;
    f()
}

/// Last path component, for log lines.
fn display_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// Serializes tests that touch the process working directory.
#[cfg(test)]
pub static CWD_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
