// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Coordinator route table

use crate::route::{Method, ParamEncoding, Route};

pub const TASK_SHOW: Route = Route::new(
    "task_show",
    Method::Get,
    "/api/tasks/:id",
    ParamEncoding::Query,
);

pub const TASK_UPDATE: Route = Route::new(
    "task_update",
    Method::Post,
    "/api/tasks/update",
    ParamEncoding::Form,
);

pub const TASK_UPDATE_FIELD: Route = Route::new(
    "task_update_field",
    Method::Post,
    "/api/tasks/update/field",
    ParamEncoding::Form,
);

pub const TASK_APPEND_OUTPUT: Route = Route::new(
    "task_append_output",
    Method::Post,
    "/api/tasks/append",
    ParamEncoding::Form,
);

pub const TASK_ARTEFACT_LIST: Route = Route::new(
    "task_artefact_list",
    Method::Get,
    "/api/tasks/:id/artefacts",
    ParamEncoding::Query,
);

pub const TASK_ARTEFACT_UPLOAD: Route = Route::new(
    "task_artefact_upload",
    Method::Post,
    "/api/tasks/artefact/upload",
    ParamEncoding::Form,
);

pub const NODE_TASKS: Route = Route::new(
    "node_tasks",
    Method::Get,
    "/api/nodes/tasks/:key",
    ParamEncoding::Query,
);

pub const NODE_REGISTER: Route = Route::new(
    "node_register",
    Method::Post,
    "/api/nodes/register",
    ParamEncoding::Form,
);

pub const NAMESPACE_UPLOAD: Route = Route::new(
    "namespace_upload",
    Method::Post,
    "/api/namespace/upload",
    ParamEncoding::Form,
);

pub const STORAGE_UPLOAD: Route = Route::new(
    "storage_upload",
    Method::Post,
    "/api/storage/upload",
    ParamEncoding::Form,
);

pub const ALL: &[Route] = &[
    TASK_SHOW,
    TASK_UPDATE,
    TASK_UPDATE_FIELD,
    TASK_APPEND_OUTPUT,
    TASK_ARTEFACT_LIST,
    TASK_ARTEFACT_UPLOAD,
    NODE_TASKS,
    NODE_REGISTER,
    NAMESPACE_UPLOAD,
    STORAGE_UPLOAD,
];

/// Look up a route by name
pub fn by_name(name: &str) -> Option<&'static Route> {
    ALL.iter().find(|route| route.name == name)
}
