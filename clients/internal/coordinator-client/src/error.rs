// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for the coordinator client

use std::path::PathBuf;

use thiserror::Error;

use coordinator_types::RouteError;

/// Errors surfaced by [`crate::CoordinatorClient`]
///
/// `Server` is never produced by the transport itself: some coordinator
/// endpoints report failures inside a 200 envelope, so only call sites
/// that opt in via [`crate::ensure_success`] see it.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be built (bad parameter, route, or URL)
    #[error("Failed to encode request: {0}")]
    Encoding(String),

    /// Network or TLS failure while talking to the coordinator
    #[error("Connection error: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The response body does not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Coordinator returned status {status}")]
    Server { status: u16 },

    #[error("Upload of {} failed with status {status}", path.display())]
    Upload { path: PathBuf, status: u16 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tls(#[from] agent_tls::TlsError),

    /// The HTTP client could not be constructed
    #[error("Client configuration error: {0}")]
    Config(String),

    #[error("Upload cancelled")]
    Cancelled,
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.into(),
            source,
        }
    }

    /// Status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status } | ClientError::Upload { status, .. } => Some(*status),
            ClientError::Connection(e) | ClientError::Timeout(e) => {
                e.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }
}

impl From<RouteError> for ClientError {
    fn from(e: RouteError) -> Self {
        ClientError::Encoding(e.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e)
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if e.is_builder() {
            ClientError::Encoding(e.to_string())
        } else {
            ClientError::Connection(e)
        }
    }
}
