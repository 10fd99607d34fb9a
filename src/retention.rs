// Stowage: backups for container data volumes.
// Copyright 2026 Stowage contributors.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Delete backups older than a retention window, without breaking lineage.
//!
//! A full backup is kept, even when expired, while any incremental backup
//! still on disk names it as parent. Dependents are looked up again from
//! disk immediately before each deletion.

use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use crate::lock::WriteLock;
use crate::*;

/// Options for pruning.
#[derive(Debug, Clone, Default)]
pub struct PruneOptions {
    /// Report what would be deleted, without deleting anything.
    pub dry_run: bool,
}

/// Why an expired backup was not deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RetainReason {
    /// Incremental backups still on disk depend on it.
    Dependents { dependents: Vec<BackupId> },
    /// Some incremental backup's metadata couldn't be read, so it's unknown
    /// whether this one is its parent.
    UnprovenLineage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetainedBackup {
    pub id: BackupId,
    #[serde(flatten)]
    pub reason: RetainReason,
}

#[derive(Debug, Serialize)]
pub struct PruneFailure {
    pub id: BackupId,
    pub category: ErrorCategory,
    pub message: String,
}

/// Result of pruning one type of backup.
#[derive(Debug, Serialize)]
pub struct PruneReport {
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub retention_days: u32,
    pub dry_run: bool,
    /// Backups deleted, or in a dry run those that would be deleted, oldest
    /// first.
    pub deleted: Vec<BackupId>,
    /// Expired backups kept to protect lineage.
    pub retained: Vec<RetainedBackup>,
    pub failed: Vec<PruneFailure>,
}

/// Delete backups of one type older than `retention_days`, measured back
/// from `now`.
///
/// Takes the lock on the backup root.
pub fn prune(
    repo: &Repository,
    backup_type: BackupType,
    retention_days: u32,
    now: OffsetDateTime,
    options: &PruneOptions,
    monitor: Arc<dyn Monitor>,
) -> Result<PruneReport> {
    let _lock = WriteLock::acquire(repo.root())?;
    prune_locked(repo, backup_type, retention_days, now, options, monitor)
}

/// Prune while the caller holds the lock.
#[instrument(skip(repo, monitor))]
pub(crate) fn prune_locked(
    repo: &Repository,
    backup_type: BackupType,
    retention_days: u32,
    now: OffsetDateTime,
    options: &PruneOptions,
    monitor: Arc<dyn Monitor>,
) -> Result<PruneReport> {
    let window = Duration::days(retention_days.into());
    let candidates: Vec<BackupId> = repo
        .list()?
        .of_type(backup_type)
        .filter(|r| now - r.timestamp > window)
        .map(|r| r.id.clone())
        .collect();
    debug!(count = candidates.len(), "Expired backups");
    let mut report = PruneReport {
        backup_type,
        retention_days,
        dry_run: options.dry_run,
        deleted: Vec::new(),
        retained: Vec::new(),
        failed: Vec::new(),
    };
    let failed = |id: &BackupId, err: &Error| PruneFailure {
        id: id.clone(),
        category: err.category(),
        message: error_chain_message(err),
    };
    for id in candidates {
        if backup_type == BackupType::Full {
            match retain_reason(repo, &id) {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    info!(%id, ?reason, "Keeping expired full backup");
                    monitor.count(Counter::BackupsRetained, 1);
                    report.retained.push(RetainedBackup { id, reason });
                    continue;
                }
                Err(err) => {
                    warn!(%id, ?err, "Can't check dependents; keeping backup");
                    report.failed.push(failed(&id, &err));
                    monitor.error(err);
                    continue;
                }
            }
        }
        if options.dry_run {
            info!(%id, "Would delete expired backup");
            report.deleted.push(id);
            continue;
        }
        match repo.delete_backup(backup_type, &id) {
            Ok(()) => {
                monitor.count(Counter::BackupsDeleted, 1);
                report.deleted.push(id);
            }
            Err(err) => {
                warn!(%id, ?err, "Failed to delete backup");
                report.failed.push(failed(&id, &err));
                monitor.error(err);
            }
        }
    }
    Ok(report)
}

/// Decide, from a fresh listing, whether a full backup must be kept.
fn retain_reason(repo: &Repository, id: &BackupId) -> Result<Option<RetainReason>> {
    let inventory = repo.list()?;
    let dependents: Vec<BackupId> = inventory.dependents_of(id).map(|r| r.id.clone()).collect();
    if !dependents.is_empty() {
        Ok(Some(RetainReason::Dependents { dependents }))
    } else if inventory
        .damaged
        .iter()
        .any(|d| d.backup_type == BackupType::Incremental)
    {
        Ok(Some(RetainReason::UnprovenLineage))
    } else {
        Ok(None)
    }
}
