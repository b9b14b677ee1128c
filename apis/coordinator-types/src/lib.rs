// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared types for build agents and the coordinator they report to.
//!
//! This crate contains the route table the agent-side client resolves
//! requests against, plus the data structures the coordinator returns:
//! task records and the generic `{status, message, payload}` envelope.

pub mod route;
pub mod routes;

pub use route::{Method, ParamEncoding, Route, RouteError};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ============================================================================
// Type Aliases
// ============================================================================

/// Task identifier as issued by the coordinator
pub type TaskId = String;

// ============================================================================
// Task Types
// ============================================================================

/// Lifecycle state of a task as reported by the coordinator.
///
/// The coordinator has historically used a handful of spellings for the
/// queued state; they all collapse into `Pending`. Anything unrecognised
/// becomes `Unknown` rather than failing the decode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    #[serde(alias = "waiting", alias = "setup")]
    Pending,
    Running,
    Done,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A task record as returned by the coordinator.
///
/// Fields missing from the payload fall back to their defaults. In
/// particular an empty `id` is how the coordinator answers for a task it
/// no longer knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Human readable task name
    pub name: String,
    /// Current lifecycle state
    pub status: TaskStatus,
    /// Outcome reported by the agent that ran the task ("success", "error", ...)
    pub result: String,
    /// Last output line recorded for the task
    pub output: String,
    /// Exit status of the task's command, as a string
    pub exit_status: String,
    /// Node the task is assigned to
    pub node_id: String,
    pub created_time: String,
    pub start_time: String,
    pub end_time: String,
}

impl Task {
    /// True once the coordinator considers the task finished
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// True while the task is executing somewhere
    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    /// True when the record does not identify any task
    pub fn is_unknown_to_coordinator(&self) -> bool {
        self.id.is_empty()
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

/// Generic response shape for endpoints without a dedicated type.
///
/// Endpoints report application-level failures inside a 200 response, so
/// callers inspect `status` rather than relying on the HTTP status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub payload: serde_json::Value,
}

impl ApiResponse {
    /// True when the coordinator flagged the call as failed
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error") || self.status.eq_ignore_ascii_case("ko")
    }
}
