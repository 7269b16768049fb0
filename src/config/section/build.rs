//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "output"       # working copy of the deploy branch
//! generator = ["wok"]     # generator program and arguments
//! ```

use crate::config::ConfigDiagnostics;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output directory, a git checkout of the deploy branch.
    pub output: PathBuf,

    /// Static site generator command, run from the project root.
    pub generator: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: "output".into(),
            generator: vec!["wok".to_string()],
        }
    }
}

impl BuildConfig {
    /// Validate build configuration.
    ///
    /// # Checks
    /// - `generator` names a program.
    /// - `output` is not empty.
    /// - Warns when the generator is not on `PATH`.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match self.generator.first() {
            Some(program) if !program.trim().is_empty() => {
                if which::which(program).is_err() {
                    diag.warn(
                        "build.generator",
                        format!("`{program}` not found on PATH"),
                    );
                }
            }
            _ => diag.error_with_hint(
                "build.generator",
                "must name a program",
                "generator = [\"wok\"]",
            ),
        }

        if self.output.as_os_str().is_empty() {
            diag.error("build.output", "must not be empty");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.output, PathBuf::from("output"));
        assert_eq!(config.build.generator, vec!["wok"]);
    }

    #[test]
    fn test_build_config_custom_generator() {
        let config = test_parse_config(
            "[build]\noutput = \"public\"\ngenerator = [\"npx\", \"eleventy\"]",
        );
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.generator, vec!["npx", "eleventy"]);
    }

    #[test]
    fn test_empty_generator_rejected() {
        let config = test_parse_config("[build]\ngenerator = []");
        let mut diag = crate::config::ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        assert!(diag.errors().iter().any(|e| e.field == "build.generator"));
    }

    #[test]
    fn test_missing_generator_only_warns() {
        let config = test_parse_config("[build]\ngenerator = [\"pages-deploy-no-such-tool\"]");
        let mut diag = crate::config::ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        assert!(diag.errors().is_empty());
        assert!(diag.warnings().any(|f| f == "build.generator"));
    }
}
