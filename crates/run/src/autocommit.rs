// SPDX-License-Identifier: MIT

//! Autocommit detection.
//!
//! The run's own commit is eventually pushed back into the repository
//! that triggers runs. Recognizing that commit at the top of both trigger
//! handlers is the sole mechanism breaking the trigger→commit→trigger
//! loop, so the comparison is exact on both fields.

use sluice_core::CommitIdentity;
use sluice_repo::{Git, GitError};

/// Exact comparison of a commit's author and message against the
/// configured autocommit identity.
pub fn matches_identity(author: &str, message: &str, identity: &CommitIdentity) -> bool {
    author == identity.author && message == identity.message
}

/// Whether `rev` was produced by this system itself.
pub async fn is_autocommit(
    git: &Git,
    rev: &str,
    identity: &CommitIdentity,
) -> Result<bool, GitError> {
    let (author, message) = git.commit_author_and_message(rev).await?;
    Ok(matches_identity(&author, &message, identity))
}

#[cfg(test)]
#[path = "autocommit_tests.rs"]
mod tests;
