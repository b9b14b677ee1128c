// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Periodic host health check
//!
//! Each tick reconciles the build root, then sweeps the host unless a task
//! assigned to this agent is running. Ticks run inline in one loop, so a
//! slow tick delays the next instead of overlapping it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::active::ActiveTasks;
use crate::config::AgentConfig;
use crate::reconcile::{ReconcileReport, Reconciler, TaskSource};
use crate::sweep::{SweepReport, sweep};

/// Why the sweep was skipped on a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepSkipped {
    /// A task assigned to this agent is running
    TaskRunning(String),
    /// The assigned tasks could not be listed
    GuardFailed(String),
}

/// What one tick did
#[derive(Debug)]
pub struct TickReport {
    /// `None` when the build root could not be read
    pub reconcile: Option<ReconcileReport>,
    pub sweep: Result<SweepReport, SweepSkipped>,
}

pub struct HealthCheck {
    source: Arc<dyn TaskSource>,
    reconciler: Reconciler,
    agent_key: String,
    clean_paths: Vec<PathBuf>,
    prune_command: Vec<String>,
    interval: Duration,
}

impl HealthCheck {
    pub fn new(source: Arc<dyn TaskSource>, active: ActiveTasks, config: &AgentConfig) -> Self {
        Self {
            reconciler: Reconciler::new(Arc::clone(&source), config.build_path.clone(), active),
            source,
            agent_key: config.agent_key.clone(),
            clean_paths: config.health_check_clean_paths.clone(),
            prune_command: config.prune_command.clone(),
            interval: config.health_check_interval(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one health check
    pub async fn tick(&self) -> TickReport {
        let reconcile = match self.reconciler.reconcile().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Build directory reconciliation failed");
                None
            }
        };

        let swept = match self.guard().await {
            Ok(()) => Ok(sweep(&self.clean_paths, &self.prune_command).await),
            Err(skipped) => {
                info!(reason = ?skipped, "Skipping host sweep");
                Err(skipped)
            }
        };

        TickReport {
            reconcile,
            sweep: swept,
        }
    }

    /// Allow the sweep only when no task of ours is running
    async fn guard(&self) -> Result<(), SweepSkipped> {
        let tasks = self
            .source
            .node_tasks(&self.agent_key)
            .await
            .map_err(|e| {
                warn!(agent = %self.agent_key, error = %e, "Failed to list assigned tasks");
                SweepSkipped::GuardFailed(e.to_string())
            })?;

        match tasks.iter().find(|t| t.is_running()) {
            Some(task) => Err(SweepSkipped::TaskRunning(task.id.clone())),
            None => Ok(()),
        }
    }

    /// Tick every interval until `cancel` fires. The first tick is
    /// immediate.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.interval.as_secs(), "Health check started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Health check stopped");
                    return;
                }
                _ = interval.tick() => {
                    debug!("Health check tick");
                    // A tick in progress finishes before cancellation is seen
                    let report = self.tick().await;
                    if let Some(reconcile) = &report.reconcile {
                        debug!(
                            removed = reconcile.removed(),
                            failed = reconcile.failed(),
                            swept = report.sweep.is_ok(),
                            "Health check tick finished"
                        );
                    }
                }
            }
        }
    }
}
