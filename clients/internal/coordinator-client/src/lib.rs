// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Build Coordinator Client Library
//!
//! Agent-side transport for the build coordinator's HTTP API.
//!
//! ## Usage
//!
//! ```ignore
//! use coordinator_client::{ClientConfig, CoordinatorClient, Request};
//! use coordinator_client::types::{Task, routes};
//!
//! let mut config = ClientConfig::new("https://coordinator.example.com");
//! config.token = Some("s3cret".to_string());
//! let client = CoordinatorClient::new(config)?;
//!
//! let task: Task = client
//!     .execute(Request::new(&routes::TASK_SHOW).interpolate("id", "42"))
//!     .await?;
//!
//! // Large files are streamed, never buffered whole
//! client.upload_artefact_retry(&path, "logs/build.log", 3).await?;
//! ```
//!
//! ## Parameters
//!
//! Request options are a closed set of [`ParamValue`] variants. Routes
//! declare whether options travel in the query string or as a form body;
//! see [`params`] for the exact rules.

pub mod api;
pub mod client;
pub mod error;
pub mod params;
pub mod request;
pub mod retry;
pub mod throttle;
pub mod upload;

pub use client::{
    ClientConfig, CoordinatorClient, DEFAULT_UPLOAD_CHUNK_SIZE, decode_json, ensure_success,
};
pub use error::ClientError;
pub use params::{Options, ParamValue};
pub use request::Request;
pub use retry::{Backoff, with_retries};
pub use throttle::Throttle;
pub use upload::{MultipartFrame, Produced};

pub use coordinator_types as types;
