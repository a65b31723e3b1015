// SPDX-License-Identifier: MIT

//! CLI command implementations

pub mod hooks;
pub mod run_session;
pub mod setup;
pub mod spew_config;
pub mod status;
pub mod unlock;
