// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Typed helpers over the coordinator route table

use std::path::Path;

use reqwest::StatusCode;

use coordinator_types::routes;
use coordinator_types::{ApiResponse, Task, TaskStatus};

use crate::client::{CoordinatorClient, decode_json, ensure_success};
use crate::error::ClientError;
use crate::request::Request;
use crate::retry::with_retries;

/// Multipart field carrying the file in every upload route
const UPLOAD_FIELD: &str = "file";

impl CoordinatorClient {
    /// Look up a task. `None` when the coordinator does not know it.
    pub async fn fetch_task(&self, id: &str) -> Result<Option<Task>, ClientError> {
        let request = Request::new(&routes::TASK_SHOW).interpolate("id", id);
        self.execute_raw(request, decode_task).await
    }

    /// The task set with [`CoordinatorClient::set_doc`]
    pub async fn fetch_current_task(&self) -> Result<Option<Task>, ClientError> {
        let id = self.active_doc()?.to_string();
        self.fetch_task(&id).await
    }

    /// Tasks the coordinator has assigned to the agent with `key`
    pub async fn node_tasks(&self, key: &str) -> Result<Vec<Task>, ClientError> {
        let request = Request::new(&routes::NODE_TASKS).interpolate("key", key);
        self.execute_raw(request, decode_success).await
    }

    pub async fn set_task_field(&self, field: &str, value: &str) -> Result<ApiResponse, ClientError> {
        let request = Request::new(&routes::TASK_UPDATE_FIELD)
            .option("id", self.active_doc()?)
            .option("field", field)
            .option("value", value);
        self.execute_for_envelope(request).await
    }

    /// Append a chunk of build output to the active task's log
    pub async fn append_task_output(&self, output: &str) -> Result<ApiResponse, ClientError> {
        let request = Request::new(&routes::TASK_APPEND_OUTPUT)
            .option("id", self.active_doc()?)
            .option("output", output);
        self.execute_for_envelope(request).await
    }

    pub async fn set_task_status(&self, status: TaskStatus) -> Result<ApiResponse, ClientError> {
        let request = Request::new(&routes::TASK_UPDATE)
            .option("id", self.active_doc()?)
            .option("status", status.to_string());
        self.execute_for_envelope(request).await
    }

    pub async fn set_task_result(
        &self,
        result: &str,
        exit_status: &str,
    ) -> Result<ApiResponse, ClientError> {
        let request = Request::new(&routes::TASK_UPDATE)
            .option("id", self.active_doc()?)
            .option("result", result)
            .option("exit_status", exit_status);
        self.execute_for_envelope(request).await
    }

    /// Announce this agent to the coordinator
    pub async fn register_node(&self, key: &str, hostname: &str) -> Result<ApiResponse, ClientError> {
        let request = Request::new(&routes::NODE_REGISTER)
            .option("key", key)
            .option("hostname", hostname);
        self.execute_for_envelope(request).await
    }

    /// Names of the artefacts already stored for task `id`
    pub async fn task_artefacts(&self, id: &str) -> Result<Vec<String>, ClientError> {
        let request = Request::new(&routes::TASK_ARTEFACT_LIST).interpolate("id", id);
        self.execute_raw(request, decode_success).await
    }

    /// Upload `full_path` as an artefact of the active task, stored under
    /// `relative_path`
    pub async fn upload_artefact(
        &self,
        full_path: &Path,
        relative_path: &str,
    ) -> Result<(), ClientError> {
        let request = self.file_request(&routes::TASK_ARTEFACT_UPLOAD, full_path, relative_path)?
            .option("taskid", self.active_doc()?);
        self.upload_large_file(request, UPLOAD_FIELD, full_path).await
    }

    /// [`Self::upload_artefact`] with up to `trials` attempts
    pub async fn upload_artefact_retry(
        &self,
        full_path: &Path,
        relative_path: &str,
        trials: u32,
    ) -> Result<(), ClientError> {
        with_retries(trials, self.backoff, "upload_artefact", move |attempt| async move {
            tracing::debug!(path = %full_path.display(), attempt, "Uploading artefact");
            self.upload_artefact(full_path, relative_path).await
        })
        .await
    }

    /// Upload a file into the coordinator namespace `namespace`
    pub async fn upload_namespace_file(
        &self,
        namespace: &str,
        full_path: &Path,
        relative_path: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .file_request(&routes::NAMESPACE_UPLOAD, full_path, relative_path)?
            .option("namespace", namespace);
        self.upload_large_file(request, UPLOAD_FIELD, full_path).await
    }

    /// Upload a file into the coordinator storage `storage_id`
    pub async fn upload_storage_file(
        &self,
        storage_id: &str,
        full_path: &Path,
        relative_path: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .file_request(&routes::STORAGE_UPLOAD, full_path, relative_path)?
            .option("storageid", storage_id);
        self.upload_large_file(request, UPLOAD_FIELD, full_path).await
    }

    fn file_request(
        &self,
        route: &'static coordinator_types::Route,
        full_path: &Path,
        relative_path: &str,
    ) -> Result<Request, ClientError> {
        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::Encoding(format!("{} has no file name", full_path.display()))
            })?;
        // The coordinator expects the directory part of the relative path
        let dir = Path::new(relative_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Request::new(route).option("name", name).option("path", dir))
    }
}

async fn decode_task(response: reqwest::Response) -> Result<Option<Task>, ClientError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let task: Task = decode_json(ensure_success(response)?).await?;
    Ok((!task.is_unknown_to_coordinator()).then_some(task))
}

async fn decode_success<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    decode_json(ensure_success(response)?).await
}
