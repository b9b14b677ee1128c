// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Tasks currently executing on this agent

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use coordinator_types::TaskId;

/// Registry of task ids whose build directories are in use locally.
///
/// Cheap to clone; clones share the same set. Reconciliation never removes
/// the directory of a registered task, whatever the coordinator reports.
#[derive(Clone, Debug, Default)]
pub struct ActiveTasks {
    inner: Arc<RwLock<HashSet<TaskId>>>,
}

impl ActiveTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a task as running here. Returns false if it already was.
    pub async fn register(&self, id: impl Into<TaskId>) -> bool {
        self.inner.write().await.insert(id.into())
    }

    pub async fn release(&self, id: &str) -> bool {
        self.inner.write().await.remove(id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
