// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice-core: shared types for the sluice repository coordinator

pub mod macros;

pub mod clock;
pub mod config;
pub mod worktree;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    CommitIdentity, Config, ConfigError, EngineSection, ReporterSection, RoutesSection,
    StoreSection,
};
pub use worktree::{WorkTree, WorkTreeError};
