//! Run stages.
//!
//! ```text
//! Start → Syncing → Building → Done                      (build)
//! Start → Syncing → Building → Staging → Committing → Pushing → Done   (publish)
//!                                       └──── Done (nothing to commit)
//! any stage ──error──→ Failed
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Syncing,
    Building,
    Staging,
    Committing,
    Pushing,
    Done,
    Failed,
}

impl Stage {
    /// Log prefix for messages emitted in this stage.
    pub const fn module(self) -> &'static str {
        match self {
            Self::Syncing => "sync",
            Self::Building => "build",
            Self::Staging | Self::Committing | Self::Pushing => "publish",
            Self::Done => "done",
            Self::Failed => "error",
            Self::Start => "deploy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Syncing => "syncing",
            Self::Building => "building",
            Self::Staging => "staging",
            Self::Committing => "committing",
            Self::Pushing => "pushing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_prefix() {
        assert_eq!(Stage::Syncing.module(), "sync");
        assert_eq!(Stage::Pushing.module(), "publish");
        assert_eq!(Stage::Failed.module(), "error");
    }

    #[test]
    fn test_display() {
        assert_eq!(Stage::Syncing.to_string(), "syncing");
        assert_eq!(Stage::Committing.to_string(), "committing");
    }
}
