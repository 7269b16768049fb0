//! Deploy runner.
//!
//! Keeps the output directory a clean checkout of the deploy branch, runs
//! the site generator into it, and on publish commits the result and pushes
//! it back with the configured token.
//!
//! Every external command goes through an [`Executor`], so the whole
//! sequence can be driven by a recorder in tests.

mod stage;

pub use stage::Stage;

use crate::{
    config::Config,
    debug, log,
    utils::{
        dir::{CwdGuard, with_dir},
        exec::{Cmd, Executor},
        git,
    },
};
use anyhow::{Context, Result};
use std::{fs, io::ErrorKind, path::Path, process::Output};

/// What a run should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Build,
    Publish,
}

pub struct Deployer<'a, E: Executor> {
    config: &'a Config,
    executor: E,
    stage: Stage,
    /// Stages entered so far, in order.
    trail: Vec<Stage>,
}

impl<'a, E: Executor> Deployer<'a, E> {
    pub fn new(config: &'a Config, executor: E) -> Self {
        Self {
            config,
            executor,
            stage: Stage::Start,
            trail: Vec::new(),
        }
    }

    /// Run `task` to completion.
    pub fn run(&mut self, task: Task) -> Result<()> {
        match task {
            Task::Build => self.build()?,
            Task::Publish => self.publish()?,
        }
        self.enter(Stage::Done);
        log!("done"; "{}", match task {
            Task::Build => "site built",
            Task::Publish => "site published",
        });
        Ok(())
    }

    #[cfg(test)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[cfg(test)]
    pub fn trail(&self) -> &[Stage] {
        &self.trail
    }

    #[cfg(test)]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Make the output directory a clean checkout of `origin/<branch>`.
    ///
    /// An existing checkout is reset in place; anything else at that path
    /// is removed and replaced by a fresh clone.
    pub fn sync(&mut self) -> Result<()> {
        self.run_stage(Stage::Syncing, |this| {
            let config = this.config;
            let output = config.output_dir();
            let branch = config.deploy.branch.as_str();

            if output.join(".git").is_dir() {
                log!("sync"; "resetting {} to origin/{}", output.display(), branch);
                with_dir(&output, || {
                    this.exec(git::reset_hard(None))?;
                    this.exec(git::clean())?;
                    this.exec(git::checkout(branch))?;
                    this.exec(git::fetch("origin"))?;
                    this.exec(git::reset_hard(Some(format!("origin/{branch}").as_str())))?;
                    Ok(())
                })
            } else {
                remove_path(&output)?;
                log!("sync"; "cloning {} into {}", config.deploy.repo, output.display());
                this.exec(git::clone(&git::https_url(&config.deploy.repo), &output))?;
                Ok(())
            }
        })
    }

    /// Sync, then run the generator from the project root.
    pub fn build(&mut self) -> Result<()> {
        self.sync()?;
        self.run_stage(Stage::Building, |this| {
            let config = this.config;
            let generator = Cmd::from_slice(&config.build.generator)
                .cwd(config.get_root())
                .passthrough(true);
            log!("build"; "running `{}`", generator.display());
            this.exec(generator)?;
            Ok(())
        })
    }

    /// Build, then commit the output and push it to the deploy branch.
    ///
    /// Fails before touching anything when no token is configured. An empty
    /// diff ends the run successfully without committing, unless
    /// `deploy.allow_empty` is set.
    pub fn publish(&mut self) -> Result<()> {
        let config = self.config;
        let token = config.require_token()?;
        let deploy = &config.deploy;

        self.build()?;

        let output = config.output_dir();
        let (_guard, changed) = self.run_stage(Stage::Staging, |this| {
            let guard = CwdGuard::enter(&output)?;
            this.exec(git::add_all())?;
            this.exec(git::config("user.email", &deploy.commit.email))?;
            this.exec(git::config("user.name", &deploy.commit.name))?;
            if deploy.allow_empty {
                return Ok((guard, true));
            }
            let status = this.exec(git::status_porcelain())?;
            Ok((guard, !String::from_utf8_lossy(&status.stdout).trim().is_empty()))
        })?;

        if !changed {
            log!("publish"; "nothing to commit, skipping push");
            return Ok(());
        }

        self.run_stage(Stage::Committing, |this| {
            this.exec(git::commit(&deploy.commit.message, deploy.allow_empty))?;
            Ok(())
        })?;

        self.run_stage(Stage::Pushing, |this| {
            let push = git::push(&deploy.repo, token, &deploy.branch, deploy.force);
            log!("publish"; "{}", push.display());
            this.exec(push)?;
            Ok(())
        })
    }

    /// Enter `stage`, run `f`, and mark the run failed if it errors.
    fn run_stage<T>(&mut self, stage: Stage, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter(stage);
        f(self).map_err(|e| {
            self.enter(Stage::Failed);
            e.context(format!("{stage} failed"))
        })
    }

    fn enter(&mut self, stage: Stage) {
        debug!(stage.module(); "{} -> {}", self.stage, stage);
        self.stage = stage;
        self.trail.push(stage);
    }

    fn exec(&mut self, cmd: Cmd) -> Result<Output> {
        Ok(self.executor.execute(&cmd)?)
    }
}

/// Remove whatever is at `path`; a missing path is fine.
fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to inspect `{}`", path.display()));
        }
    };

    debug!("sync"; "removing {}", path.display());
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("Failed to remove `{}`", path.display()))
}
