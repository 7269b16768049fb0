//! Shared utilities.
//!
//! | Module   | Purpose                                        |
//! |----------|------------------------------------------------|
//! | `dir`    | Scoped working-directory changes               |
//! | `exec`   | External command builder and executor seam     |
//! | `git`    | Git invocations used by the deploy runner      |
//! | `secret` | Credential wrapper that never prints its value |

pub mod dir;
pub mod exec;
pub mod git;
pub mod secret;
