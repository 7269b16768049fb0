//! External command execution utilities.
//!
//! Provides a Builder-based API for running commands as structured argument
//! lists (never shell strings), with redaction of secret arguments.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Simple command
//! Cmd::new("git").args(["status", "--porcelain"]).run()?;
//!
//! // Argument carrying a credential: displayed with the token masked
//! Cmd::new("git")
//!     .arg("push")
//!     .secret_arg(|t| format!("https://{t}@{remote}"), &token)
//!     .run()?;
//! ```

use super::secret::{REDACTED, Secret};
use crate::debug;
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Output},
    sync::OnceLock,
};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to execute `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{program}` failed with {status}{detail}")]
    Failed {
        program: String,
        status: ExitStatus,
        /// Scrubbed stderr/stdout, prefixed with a newline when non-empty.
        detail: String,
    },
}

// ============================================================================
// Builder API
// ============================================================================

struct Arg {
    value: OsString,
    /// Display form, set for arguments that embed a secret.
    shown: Option<String>,
}

/// Command builder for external process execution.
///
/// Provides a fluent API for configuring and running external commands.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<Arg>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    secrets: Vec<Secret>,
    passthrough: bool,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["wok"]` or `["npx", "eleventy"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        Self::new(program).args(iter)
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(Arg {
                value: arg.to_owned(),
                shown: None,
            });
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Add an argument that embeds `secret`.
    ///
    /// `render` builds the argument from a credential string. The process
    /// receives it rendered with the real value; every displayed form of the
    /// command renders it with [`REDACTED`] instead. Captured output is
    /// scrubbed of the secret value as well.
    pub fn secret_arg(mut self, render: impl Fn(&str) -> String, secret: &Secret) -> Self {
        self.args.push(Arg {
            value: render(secret.expose()).into(),
            shown: Some(render(REDACTED)),
        });
        if !secret.is_empty() {
            self.secrets.push(secret.clone());
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Log stdout as well as stderr on success.
    pub fn passthrough(mut self, enable: bool) -> Self {
        self.passthrough = enable;
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Get the program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Working directory set with [`Cmd::cwd`], if any.
    #[cfg(test)]
    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Raw arguments as passed to the process.
    pub fn raw_args(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(|a| a.value.as_os_str())
    }

    /// Render the command line for humans, with secrets masked.
    pub fn display(&self) -> String {
        let mut parts = vec![quote(&self.program_name())];
        for arg in &self.args {
            let shown = match &arg.shown {
                Some(shown) => shown.clone(),
                None => arg.value.to_string_lossy().into_owned(),
            };
            parts.push(quote(&shown));
        }
        parts.join(" ")
    }

    /// Replace every registered secret in `text` with [`REDACTED`].
    pub fn scrub(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_owned(), |acc, s| acc.replace(s.expose(), REDACTED))
    }

    /// Execute the command and return its captured output.
    ///
    /// A non-zero exit status is an error.
    pub fn run(&self) -> Result<Output, ExecError> {
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);
        let name = self.program_name();
        debug!(&name; "running `{}`", self.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(self.raw_args()).envs(self.envs.iter().cloned());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| ExecError::Spawn {
            program: name.clone(),
            source,
        })?;

        self.log_output(&name, &output, filter)?;
        Ok(output)
    }

    /// Log command output, returning error on failure.
    fn log_output(
        &self,
        name: &str,
        output: &Output,
        filter: &'static FilterRule,
    ) -> Result<(), ExecError> {
        if !output.status.success() {
            return Err(ExecError::Failed {
                program: name.to_owned(),
                status: output.status,
                detail: self.format_detail(output, filter),
            });
        }

        if self.passthrough {
            let stdout = String::from_utf8_lossy(&output.stdout);
            filter.log(name, &self.scrub(stdout.trim()));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        filter.log(name, &self.scrub(stderr.trim()));
        Ok(())
    }

    /// Format the detail part of a failure message.
    fn format_detail(&self, output: &Output, filter: &'static FilterRule) -> String {
        let stderr = self.scrub(&String::from_utf8_lossy(&output.stderr));
        let stdout = self.scrub(&String::from_utf8_lossy(&output.stdout));

        let error_msg = filter
            .skip_prefixes
            .iter()
            .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

        let mut msg = String::new();
        if !error_msg.is_empty() {
            msg.push('\n');
            msg.push_str(error_msg);
        }

        let stdout_trimmed = stdout.trim();
        if !stdout_trimmed.is_empty() {
            msg.push_str("\nStdout:\n");
            msg.push_str(stdout_trimmed);
        }
        msg
    }
}

// ============================================================================
// Executor seam
// ============================================================================

/// Runs commands on behalf of the deploy runner.
pub trait Executor {
    fn execute(&mut self, cmd: &Cmd) -> Result<Output, ExecError>;
}

/// Executor that spawns real processes found on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&mut self, cmd: &Cmd) -> Result<Output, ExecError> {
        cmd.run()
    }
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| {
                let plain = strip_ansi(line);
                let trimmed = plain.trim();
                !trimmed.is_empty() && !self.should_skip(trimmed)
            })
            .collect();

        if !lines.is_empty() {
            crate::log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Quote an argument for display if it contains whitespace.
fn quote(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_owned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["npx", "eleventy", "--quiet"]);
        assert_eq!(cmd.program_name(), "npx");
        assert_eq!(cmd.display(), "npx eleventy --quiet");
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = Cmd::new("git").args(["commit", "-m", "Travis Build"]);
        assert_eq!(cmd.display(), "git commit -m \"Travis Build\"");
    }

    #[test]
    fn test_secret_arg_masked_in_display() {
        let token = Secret::new("ghp_s3cret");
        let cmd = Cmd::new("git")
            .arg("push")
            .secret_arg(|t| format!("https://{t}@github.com/a/b.git"), &token);

        let shown = cmd.display();
        assert!(!shown.contains("ghp_s3cret"));
        assert_eq!(shown, "git push https://********@github.com/a/b.git");

        // the process still receives the real value
        let raw: Vec<_> = cmd.raw_args().collect();
        assert_eq!(raw[1], OsStr::new("https://ghp_s3cret@github.com/a/b.git"));
    }

    #[test]
    fn test_scrub_output() {
        let token = Secret::new("tok");
        let cmd = Cmd::new("git").secret_arg(|t| format!("https://{t}@host/x"), &token);
        assert_eq!(
            cmd.scrub("fatal: unable to access 'https://tok@host/x'"),
            "fatal: unable to access 'https://********@host/x'"
        );
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["hint:", "warning:"]);
        assert!(filter.should_skip("hint: something"));
        assert!(filter.should_skip("warning: something"));
        assert!(!filter.should_skip("fatal: something"));
        assert!(filter.should_skip(""));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_simple_command() {
        let output = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_failing_command() {
        let err = Cmd::new("false").run().unwrap_err();
        assert!(matches!(err, ExecError::Failed { ref program, .. } if program == "false"));
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::new("pages-deploy-no-such-binary").run().unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_failure_detail_is_scrubbed() {
        let token = Secret::new("leaky");
        let err = Cmd::new("sh")
            .args(["-c", "echo \"$0\" >&2; exit 3"])
            .secret_arg(|t| t.to_owned(), &token)
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(!msg.contains("leaky"));
        assert!(msg.contains(REDACTED));
    }
}
