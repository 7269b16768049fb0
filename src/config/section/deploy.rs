//! `[deploy]` section configuration.
//!
//! Where the generated site is pushed and who commits it.
//!
//! # Example
//!
//! ```toml
//! [deploy]
//! repo = "github.com/mythmon/mythmon.com.git"   # host/path, no scheme
//! branch = "gh-pages"                            # Target branch
//! token_env = "GH_TOKEN"                         # Variable holding the push token
//! force = true                                   # Force push (overwrites remote history)
//! allow_empty = false                            # Commit even without changes
//!
//! [deploy.commit]
//! name = "Travis Build"
//! email = "travis@mythmon.com"
//! message = "Travis Build"
//! ```

use crate::config::ConfigDiagnostics;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Remote repository as `host/path`.
    pub repo: String,

    /// Deploy branch, checked out in the output directory.
    pub branch: String,

    /// Environment variable read once at start-up for the push token.
    pub token_env: String,

    /// Force push (overwrites remote history).
    pub force: bool,

    /// Commit and push even when nothing changed.
    pub allow_empty: bool,

    /// Committer identity and message.
    pub commit: CommitConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            repo: "github.com/mythmon/mythmon.com.git".to_string(),
            branch: "gh-pages".to_string(),
            token_env: "GH_TOKEN".to_string(),
            force: true,
            allow_empty: false,
            commit: CommitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            name: "Travis Build".to_string(),
            email: "travis@mythmon.com".to_string(),
            message: "Travis Build".to_string(),
        }
    }
}

impl DeployConfig {
    /// Validate deploy configuration.
    ///
    /// # Checks
    /// - `repo` is a bare `host/path`: no scheme, no credentials.
    /// - `branch` is a single non-empty word.
    /// - `token_env` and the commit identity are set.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let repo = self.repo.trim();
        if repo.is_empty() {
            diag.error_with_hint(
                "deploy.repo",
                "must not be empty",
                "repo = \"github.com/user/site.git\"",
            );
        } else if repo.contains("://") {
            diag.error_with_hint(
                "deploy.repo",
                format!("must not include a scheme: {repo}"),
                "https:// is added automatically",
            );
        } else if repo.contains('@') {
            diag.error_with_hint(
                "deploy.repo",
                "must not include credentials",
                format!("the token is read from ${}", self.token_env),
            );
        }

        if self.branch.is_empty() || self.branch.chars().any(char::is_whitespace) {
            diag.error("deploy.branch", format!("invalid branch name: {:?}", self.branch));
        }

        if self.token_env.trim().is_empty() {
            diag.error("deploy.token_env", "must name an environment variable");
        }

        for (field, value) in [
            ("deploy.commit.name", &self.commit.name),
            ("deploy.commit.email", &self.commit.email),
            ("deploy.commit.message", &self.commit.message),
        ] {
            if value.trim().is_empty() {
                diag.error(field, "must not be empty");
            }
        }
    }
}
