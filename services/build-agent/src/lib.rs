// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Build Agent Library
//!
//! Host-side maintenance for a build agent. The agent keeps one build
//! directory per task under its build root; this library decides when
//! those directories, and other scratch state on the host, can go.
//!
//! # Modules
//!
//! - [`config`] - Agent configuration (coordinator, uploads, health check)
//! - [`active`] - Registry of tasks running on this agent
//! - [`reconcile`] - Build directory garbage collection against the coordinator
//! - [`sweep`] - Clean path emptying and container pruning
//! - [`health`] - The periodic health check tying the above together

pub mod active;
pub mod config;
pub mod error;
pub mod health;
pub mod reconcile;
pub mod sweep;

pub use active::ActiveTasks;
pub use config::AgentConfig;
pub use error::AgentError;
pub use health::HealthCheck;
