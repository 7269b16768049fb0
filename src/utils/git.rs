//! Git invocations used by the deploy runner.
//!
//! Each function returns a [`Cmd`] for the `git` binary on `PATH`; nothing
//! here runs a process. The runner decides where and when to execute them.

use super::exec::{Cmd, FilterRule};
use super::secret::Secret;
use std::path::Path;

/// Drop git's advice lines from logged output.
pub static GIT_FILTER: FilterRule = FilterRule::new(&["hint:"]);

/// Base `git` command.
///
/// Terminal prompts are disabled so a rejected token fails instead of
/// waiting for input.
fn git() -> Cmd {
    Cmd::new("git")
        .envs([("GIT_TERMINAL_PROMPT", "0")])
        .filter(&GIT_FILTER)
}

/// Anonymous HTTPS URL for a `host/path` remote.
pub fn https_url(remote: &str) -> String {
    format!("https://{remote}")
}

/// HTTPS URL with `credential` as basic-auth user.
pub fn auth_url(remote: &str, credential: &str) -> String {
    format!("https://{credential}@{remote}")
}

pub fn clone(url: &str, dest: &Path) -> Cmd {
    git().args(["clone", url]).arg(dest)
}

/// `git reset --hard [target]`
pub fn reset_hard(target: Option<&str>) -> Cmd {
    let cmd = git().args(["reset", "--hard"]);
    match target {
        Some(target) => cmd.arg(target),
        None => cmd,
    }
}

/// Remove untracked and ignored files.
pub fn clean() -> Cmd {
    git().args(["clean", "-fxd"])
}

pub fn checkout(branch: &str) -> Cmd {
    git().args(["checkout", branch])
}

pub fn fetch(remote: &str) -> Cmd {
    git().args(["fetch", remote])
}

/// Stage everything under the current directory, deletions included.
pub fn add_all() -> Cmd {
    git().args(["add", "--all", "."])
}

pub fn config(key: &str, value: &str) -> Cmd {
    git().args(["config", key, value])
}

/// Porcelain status; empty stdout means nothing to commit.
pub fn status_porcelain() -> Cmd {
    git().args(["status", "--porcelain"])
}

pub fn commit(message: &str, allow_empty: bool) -> Cmd {
    let cmd = git().arg("commit");
    let cmd = if allow_empty { cmd.arg("--allow-empty") } else { cmd };
    cmd.args(["-m", message])
}

/// Push `branch` to the same branch name on an authenticated URL.
pub fn push(remote: &str, token: &Secret, branch: &str, force: bool) -> Cmd {
    let cmd = git().arg("push");
    let cmd = if force { cmd.arg("--force") } else { cmd };
    cmd.secret_arg(|t| auth_url(remote, t), token)
        .arg(format!("{branch}:{branch}"))
}
