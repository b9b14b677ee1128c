// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for host maintenance

use std::path::PathBuf;

use thiserror::Error;

use coordinator_client::ClientError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to read build root {}: {source}", path.display())]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The coordinator could not tell us the state of a task
    #[error("Failed to look up task {id}: {source}")]
    Lookup {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reconciling a single directory crashed; the others are unaffected
    #[error("Reconciliation of {dir} aborted: {reason}")]
    Panicked { dir: String, reason: String },

    #[error("Failed to empty {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prune command `{command}` failed: {reason}")]
    Prune { command: String, reason: String },
}
