// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Host sweep: empty scratch directories and prune container state

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::AgentError;

/// What a sweep did. Failures are recorded, never raised.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Entries removed from each clean path
    pub cleaned: Vec<(PathBuf, usize)>,
    pub pruned: bool,
    pub errors: Vec<AgentError>,
}

/// Empty every clean path, then run the prune command
pub async fn sweep(clean_paths: &[PathBuf], prune_command: &[String]) -> SweepReport {
    let mut report = SweepReport::default();

    for path in clean_paths {
        match empty_dir(path).await {
            Ok(removed) => {
                info!(path = %path.display(), removed, "Emptied clean path");
                report.cleaned.push((path.clone(), removed));
            }
            Err(e) => {
                warn!(error = %e, "Failed to empty clean path");
                report.errors.push(e);
            }
        }
    }

    match prune(prune_command).await {
        Ok(ran) => report.pruned = ran,
        Err(e) => {
            warn!(error = %e, "Prune failed");
            report.errors.push(e);
        }
    }

    report
}

/// Remove everything inside `path`, keeping `path` itself.
///
/// Symlinks are removed, not followed. A missing directory counts as
/// already empty.
pub async fn empty_dir(path: &Path) -> Result<usize, AgentError> {
    let clean_err = |source| AgentError::Clean {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(clean_err(e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await.map_err(clean_err)? {
        let target = entry.path();
        let file_type = entry.file_type().await.map_err(clean_err)?;
        let res = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        res.map_err(|source| AgentError::Clean {
            path: target,
            source,
        })?;
        removed += 1;
    }
    Ok(removed)
}

/// Run the prune command, logging its output. Returns false when no
/// command is configured.
pub async fn prune(command: &[String]) -> Result<bool, AgentError> {
    let Some((program, args)) = command.split_first() else {
        debug!("No prune command configured");
        return Ok(false);
    };
    let shown = command.join(" ");
    info!(command = %shown, "Pruning container state");

    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AgentError::Prune {
            command: shown.clone(),
            reason: e.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        info!(command = %shown, output = %stdout.trim(), "Prune output");
    }
    if !stderr.trim().is_empty() {
        warn!(command = %shown, output = %stderr.trim(), "Prune stderr");
    }

    if !output.status.success() {
        return Err(AgentError::Prune {
            command: shown,
            reason: output.status.to_string(),
        });
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_dir_keeps_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/c"), b"x").unwrap();
        std::fs::write(dir.path().join("f"), b"x").unwrap();

        assert_eq!(empty_dir(dir.path()).await.unwrap(), 2);
        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        assert_eq!(empty_dir(&dir.path().join("missing")).await.unwrap(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_dir_does_not_follow_symlinks() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("keep"), b"x").unwrap();

        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        assert_eq!(empty_dir(dir.path()).await.unwrap(), 1);
        assert!(outside.path().join("keep").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prune_command() {
        assert!(!prune(&[]).await.unwrap());
        assert!(prune(&strings(&["true"])).await.unwrap());
        assert!(matches!(
            prune(&strings(&["false"])).await,
            Err(AgentError::Prune { .. })
        ));
        assert!(prune(&strings(&["/definitely/not/a/binary"])).await.is_err());
    }

    /// A failing prune does not undo or stop the cleaning
    #[cfg(unix)]
    #[tokio::test]
    async fn test_sweep_records_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), b"x").unwrap();

        let report = sweep(&[dir.path().to_path_buf()], &strings(&["false"])).await;

        assert_eq!(report.cleaned, vec![(dir.path().to_path_buf(), 1)]);
        assert!(!report.pruned);
        assert_eq!(report.errors.len(), 1);
    }
}
