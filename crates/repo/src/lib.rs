// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice-repo: version-control gateway and large-object routing

pub mod gateway;
pub mod routes;

pub use gateway::{Git, GitError, RepoEnv, DEFAULT_BRANCH, DEFAULT_REMOTE};
pub use routes::{append_routes, current_routes, LargeFileScan};
