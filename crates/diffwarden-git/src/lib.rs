//! Git access for diffwarden.
//!
//! Reads the change introduced by the latest commit of a local checkout
//! using git2, so no `git` binary is needed on the CI runner.

pub mod diff;

pub use diff::{diff_last_commit, CommitDiff};
