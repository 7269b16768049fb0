//! Configuration section definitions.
//!
//! | Section           | Purpose                                   |
//! |-------------------|-------------------------------------------|
//! | `[build]`         | Output directory and generator command    |
//! | `[deploy]`        | Remote, branch, token variable, push mode |
//! | `[deploy.commit]` | Committer identity and message            |

mod build;
mod deploy;

pub use build::BuildConfig;
pub use deploy::DeployConfig;
