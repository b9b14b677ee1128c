// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Build directory reconciliation
//!
//! Every subdirectory of the build root is named after the task that
//! produced it. A directory is removed only once the coordinator says its
//! task is finished or no longer exists, and never while the task runs on
//! this agent. Any doubt keeps the directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use coordinator_client::{ClientError, CoordinatorClient};
use coordinator_types::{Task, TaskStatus};

use crate::active::ActiveTasks;
use crate::error::AgentError;

/// Where task state is looked up
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// The task, or `None` if the coordinator does not know it
    async fn fetch_task(&self, id: &str) -> Result<Option<Task>, ClientError>;

    /// Tasks assigned to the agent with `key`
    async fn node_tasks(&self, key: &str) -> Result<Vec<Task>, ClientError>;
}

#[async_trait]
impl TaskSource for CoordinatorClient {
    async fn fetch_task(&self, id: &str) -> Result<Option<Task>, ClientError> {
        CoordinatorClient::fetch_task(self, id).await
    }

    async fn node_tasks(&self, key: &str) -> Result<Vec<Task>, ClientError> {
        CoordinatorClient::node_tasks(self, key).await
    }
}

/// Why a directory was left in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    /// Registered as running on this agent
    Active,
    /// The coordinator reports the task as not yet done
    NotDone(TaskStatus),
}

/// What happened to one build directory
#[derive(Debug)]
pub enum DirOutcome {
    Removed,
    Kept(KeepReason),
    /// Lookup or removal failed; the directory may still exist
    Failed(AgentError),
}

/// Outcome of one pass over the build root, in directory name order
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub entries: Vec<(String, DirOutcome)>,
}

impl ReconcileReport {
    pub fn removed(&self) -> usize {
        self.count(|o| matches!(o, DirOutcome::Removed))
    }

    pub fn kept(&self) -> usize {
        self.count(|o| matches!(o, DirOutcome::Kept(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DirOutcome::Failed(_)))
    }

    pub fn outcome(&self, dir: &str) -> Option<&DirOutcome> {
        self.entries.iter().find(|(d, _)| d == dir).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&DirOutcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Removes build directories whose tasks are over
#[derive(Clone)]
pub struct Reconciler {
    source: Arc<dyn TaskSource>,
    build_path: PathBuf,
    active: ActiveTasks,
}

impl Reconciler {
    pub fn new(source: Arc<dyn TaskSource>, build_path: PathBuf, active: ActiveTasks) -> Self {
        Self {
            source,
            build_path,
            active,
        }
    }

    pub fn build_path(&self) -> &Path {
        &self.build_path
    }

    /// Reconcile every directory under the build root.
    ///
    /// Each directory is handled in its own task so that a crash while
    /// handling one is reported as its outcome instead of ending the pass.
    /// Tasks are awaited one at a time; no two directories are touched
    /// concurrently. A missing build root is an empty pass.
    pub async fn reconcile(&self) -> Result<ReconcileReport, AgentError> {
        let dirs = match list_dirs(&self.build_path).await {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.build_path.display(), "Build root does not exist");
                return Ok(ReconcileReport::default());
            }
            Err(source) => {
                return Err(AgentError::ReadRoot {
                    path: self.build_path.clone(),
                    source,
                });
            }
        };

        let mut report = ReconcileReport::default();
        for name in dirs {
            let path = self.build_path.join(&name);
            let source = Arc::clone(&self.source);
            let active = self.active.clone();
            let id = name.clone();

            let handle =
                tokio::spawn(async move { reconcile_dir(source.as_ref(), &active, &id, &path).await });

            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(dir = %name, error = %e, "Directory reconciliation aborted");
                    DirOutcome::Failed(AgentError::Panicked {
                        dir: name.clone(),
                        reason: e.to_string(),
                    })
                }
            };
            report.entries.push((name, outcome));
        }

        info!(
            removed = report.removed(),
            kept = report.kept(),
            failed = report.failed(),
            "Build directories reconciled"
        );
        Ok(report)
    }
}

async fn reconcile_dir(
    source: &dyn TaskSource,
    active: &ActiveTasks,
    id: &str,
    path: &Path,
) -> DirOutcome {
    if active.contains(id).await {
        debug!(task = id, "Task is running here, keeping directory");
        return DirOutcome::Kept(KeepReason::Active);
    }

    let task = match source.fetch_task(id).await {
        Ok(task) => task,
        Err(source) => {
            warn!(task = id, error = %source, "Task lookup failed, keeping directory");
            return DirOutcome::Failed(AgentError::Lookup {
                id: id.to_string(),
                source,
            });
        }
    };

    match task {
        Some(task) if !task.is_done() => {
            debug!(task = id, status = %task.status, "Task not done, keeping directory");
            DirOutcome::Kept(KeepReason::NotDone(task.status))
        }
        _ => {
            info!(task = id, dir = %path.display(), "Removing build directory");
            match tokio::fs::remove_dir_all(path).await {
                Ok(()) => DirOutcome::Removed,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => DirOutcome::Removed,
                Err(source) => {
                    warn!(dir = %path.display(), error = %source, "Failed to remove build directory");
                    DirOutcome::Failed(AgentError::Remove {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }
}

/// Names of the subdirectories of `root`, sorted. Other entries are ignored.
async fn list_dirs(root: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => dirs.push(name),
            Err(raw) => warn!(name = ?raw, "Skipping build directory with non UTF-8 name"),
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Answers from a fixed table; panics on ids starting with "boom"
    struct FakeSource {
        tasks: HashMap<String, Result<Option<TaskStatus>, u16>>,
    }

    #[async_trait]
    impl TaskSource for FakeSource {
        async fn fetch_task(&self, id: &str) -> Result<Option<Task>, ClientError> {
            if id.starts_with("boom") {
                panic!("lookup exploded for {}", id);
            }
            match self.tasks.get(id) {
                Some(Ok(Some(status))) => Ok(Some(Task {
                    id: id.to_string(),
                    status: *status,
                    ..Default::default()
                })),
                Some(Ok(None)) | None => Ok(None),
                Some(Err(status)) => Err(ClientError::Server { status: *status }),
            }
        }

        async fn node_tasks(&self, _key: &str) -> Result<Vec<Task>, ClientError> {
            Ok(Vec::new())
        }
    }

    fn build_root(dirs: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        for dir in dirs {
            std::fs::create_dir_all(root.path().join(dir).join("out")).unwrap();
            std::fs::write(root.path().join(dir).join("out/log"), b"log").unwrap();
        }
        root
    }

    fn reconciler(root: &TempDir, tasks: &[(&str, Result<Option<TaskStatus>, u16>)]) -> Reconciler {
        let source = FakeSource {
            tasks: tasks.iter().map(|(id, r)| (id.to_string(), *r)).collect(),
        };
        Reconciler::new(Arc::new(source), root.path().to_path_buf(), ActiveTasks::new())
    }

    #[tokio::test]
    async fn test_keep_remove_matrix() {
        let root = build_root(&["done", "running", "pending", "gone", "broken", "unknown"]);
        let reconciler = reconciler(
            &root,
            &[
                ("done", Ok(Some(TaskStatus::Done))),
                ("running", Ok(Some(TaskStatus::Running))),
                ("pending", Ok(Some(TaskStatus::Pending))),
                ("gone", Ok(None)),
                ("broken", Err(500)),
                ("unknown", Ok(Some(TaskStatus::Unknown))),
            ],
        );

        let report = reconciler.reconcile().await.unwrap();

        for removed in ["done", "gone"] {
            assert!(matches!(report.outcome(removed), Some(DirOutcome::Removed)));
            assert!(!root.path().join(removed).exists());
        }
        for kept in ["running", "pending", "unknown", "broken"] {
            assert!(root.path().join(kept).exists(), "{} must survive", kept);
        }
        assert!(matches!(
            report.outcome("running"),
            Some(DirOutcome::Kept(KeepReason::NotDone(TaskStatus::Running)))
        ));
        assert!(matches!(
            report.outcome("broken"),
            Some(DirOutcome::Failed(AgentError::Lookup { .. }))
        ));
        assert_eq!((report.removed(), report.kept(), report.failed()), (2, 3, 1));
    }

    #[tokio::test]
    async fn test_active_tasks_are_never_removed() {
        let root = build_root(&["t1"]);
        let active = ActiveTasks::new();
        active.register("t1").await;

        let source = FakeSource {
            tasks: HashMap::from([("t1".to_string(), Ok(Some(TaskStatus::Done)))]),
        };
        let reconciler = Reconciler::new(Arc::new(source), root.path().to_path_buf(), active);

        let report = reconciler.reconcile().await.unwrap();
        assert!(matches!(
            report.outcome("t1"),
            Some(DirOutcome::Kept(KeepReason::Active))
        ));
        assert!(root.path().join("t1").exists());
    }

    /// A crash on one directory does not stop the others
    #[tokio::test]
    async fn test_panic_is_contained() {
        let root = build_root(&["a-done", "boom-1", "c-done"]);
        let reconciler = reconciler(
            &root,
            &[
                ("a-done", Ok(Some(TaskStatus::Done))),
                ("c-done", Ok(Some(TaskStatus::Done))),
            ],
        );

        let report = reconciler.reconcile().await.unwrap();

        assert!(matches!(
            report.outcome("boom-1"),
            Some(DirOutcome::Failed(AgentError::Panicked { .. }))
        ));
        assert!(root.path().join("boom-1").exists());
        assert!(!root.path().join("a-done").exists());
        assert!(!root.path().join("c-done").exists());
    }

    #[tokio::test]
    async fn test_files_and_missing_root() {
        let root = build_root(&[]);
        std::fs::write(root.path().join("stray.txt"), b"x").unwrap();

        let report = reconciler(&root, &[]).reconcile().await.unwrap();
        assert!(report.entries.is_empty());
        assert!(root.path().join("stray.txt").exists());

        let missing = Reconciler::new(
            Arc::new(FakeSource {
                tasks: HashMap::new(),
            }),
            root.path().join("nope"),
            ActiveTasks::new(),
        );
        assert!(missing.reconcile().await.unwrap().entries.is_empty());
    }
}
