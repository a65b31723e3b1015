// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice-run: run coordination — lock, trigger guard, launcher, session, setup

pub mod autocommit;
pub mod launch;
pub mod lock;
pub mod session;
pub mod setup;

pub use autocommit::{is_autocommit, matches_identity};
pub use launch::{launch_detached, LaunchError};
pub use lock::{pid_alive, LockError, LockOwner, RunLock, RunLockGuard};
pub use session::{EngineFailure, RunPhase, RunSession, SessionError};
pub use setup::{setup_repo, SetupError, SetupOptions};
