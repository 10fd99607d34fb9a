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

//! Restore backups onto live storage.
//!
//! Restore happens in two steps. [plan_restore] works out, from the
//! metadata alone, which stored archive supplies each component: the
//! target backup if it holds that component, otherwise its parent full
//! backup. [apply_plan] then checks and extracts each archive in turn,
//! replacing whatever was in the destination.
//!
//! Problems with one component never stop the others from being restored.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::io::{clear_directory, path_has_data};
use crate::lock::WriteLock;
use crate::tarball::{extract_archive, ArchiveStats};
use crate::verify::{check_artifact, ArtifactStatus};
use crate::*;

/// Options for restore.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Restore only these components; by default, everything the backup
    /// and its parent hold.
    pub components: Option<Vec<Component>>,
    /// Overwrite destinations that already have data, and restore archives
    /// that fail their checksum.
    pub force: bool,
}

/// Where one component will be restored from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSource {
    pub backup_id: BackupId,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub archive: PathBuf,
}

/// One component of a restore plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedComponent {
    pub component: Component,
    /// None if neither the target nor its parent holds this component.
    pub source: Option<ComponentSource>,
}

/// The archives that satisfy a restore request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestorePlan {
    pub target: BackupRecord,
    /// The full backup an incremental target is based on.
    pub parent: Option<BackupRecord>,
    pub components: Vec<PlannedComponent>,
}

/// Resolve the target backup, and its parent if it's incremental, and
/// choose the source of each requested component.
///
/// Only one level of parent is followed: an incremental whose parent is
/// missing, or is itself incremental, is rejected.
#[instrument(skip(repo))]
pub fn plan_restore(
    repo: &Repository,
    id: &BackupId,
    components: Option<&[Component]>,
) -> Result<RestorePlan> {
    let target = repo.find(id)?;
    let parent = match (target.backup_type, &target.parent) {
        (BackupType::Full, _) => None,
        (BackupType::Incremental, None) => return Err(Error::MissingParent { id: id.clone() }),
        (BackupType::Incremental, Some(parent_id)) => {
            let parent = repo.find(parent_id).map_err(|err| match err {
                Error::BackupNotFound { .. } => Error::ParentNotFound {
                    id: id.clone(),
                    parent: parent_id.clone(),
                },
                other => other,
            })?;
            if parent.backup_type != BackupType::Full {
                return Err(Error::ParentNotFull {
                    id: id.clone(),
                    parent: parent_id.clone(),
                });
            }
            Some(parent)
        }
    };

    let mut requested: Vec<Component> = match components {
        Some(components) => components.to_vec(),
        None => parent
            .iter()
            .chain(std::iter::once(&target))
            .flat_map(|r| r.components.iter().cloned())
            .collect(),
    };
    let mut seen = std::collections::HashSet::new();
    requested.retain(|c| seen.insert(c.clone()));

    let components = requested
        .into_iter()
        .map(|component| {
            let source = std::iter::once(&target)
                .chain(parent.iter())
                .find(|r| r.has_component(&component))
                .map(|r| ComponentSource {
                    backup_id: r.id.clone(),
                    backup_type: r.backup_type,
                    archive: repo.record_artifact_path(r, &component),
                });
            debug!(%component, ?source);
            PlannedComponent { component, source }
        })
        .collect();
    Ok(RestorePlan {
        target,
        parent,
        components,
    })
}

/// How the checksum of a restored archive turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumStatus {
    /// The archive matched its checksum.
    Verified,
    /// There was no checksum file to check against.
    Absent,
    /// The checksum did not match, or couldn't be parsed, but restore was
    /// forced.
    ForcedMismatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoredComponent {
    pub component: Component,
    pub source: ComponentSource,
    pub destination: PathBuf,
    pub checksum: ChecksumStatus,
    pub stats: ArchiveStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedComponent {
    pub component: Component,
    pub destination: PathBuf,
    /// Always a conflict: the destination already holds data.
    pub category: ErrorCategory,
    pub message: String,
}

/// What happened to each component in a restore.
#[derive(Debug, Serialize)]
pub struct RestoreReport {
    pub id: BackupId,
    pub restored: Vec<RestoredComponent>,
    pub skipped: Vec<SkippedComponent>,
    pub failed: Vec<ComponentFailure>,
}

impl RestoreReport {
    /// True if every planned component was restored.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

enum Outcome {
    Restored(RestoredComponent),
    Skipped(SkippedComponent),
}

/// Restore a backup, taking the lock on the backup root.
pub fn restore(
    repo: &Repository,
    volumes: &dyn VolumeTree,
    id: &BackupId,
    options: &RestoreOptions,
    monitor: Arc<dyn Monitor>,
) -> Result<RestoreReport> {
    let _lock = WriteLock::acquire(repo.root())?;
    let plan = plan_restore(repo, id, options.components.as_deref())?;
    Ok(apply_plan(&plan, volumes, options.force, monitor))
}

/// Check and extract each planned component onto its live destination.
#[instrument(skip_all, fields(id = %plan.target.id))]
pub fn apply_plan(
    plan: &RestorePlan,
    volumes: &dyn VolumeTree,
    force: bool,
    monitor: Arc<dyn Monitor>,
) -> RestoreReport {
    let mut report = RestoreReport {
        id: plan.target.id.clone(),
        restored: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
    };
    for planned in &plan.components {
        let component = &planned.component;
        let task = monitor.start_task(format!("Restore {component}"));
        match restore_component(plan, planned, volumes, force) {
            Ok(Outcome::Restored(restored)) => {
                info!(%component, source = %restored.source.backup_id, "Restored");
                monitor.count(Counter::ComponentsRestored, 1);
                monitor.count(Counter::RestoredFileBytes, restored.stats.file_bytes as usize);
                report.restored.push(restored);
            }
            Ok(Outcome::Skipped(skipped)) => {
                warn!(
                    %component,
                    destination = ?skipped.destination,
                    "Destination already has data; skipped"
                );
                monitor.count(Counter::ComponentsSkipped, 1);
                report.skipped.push(skipped);
            }
            Err(error) => {
                warn!(%component, ?error, "Failed to restore component");
                monitor.count(Counter::ComponentsFailed, 1);
                let failure = ComponentFailure {
                    component: component.clone(),
                    error,
                };
                monitor.error(failure.summary());
                report.failed.push(failure);
            }
        }
        task.increment(1);
    }
    report
}

fn restore_component(
    plan: &RestorePlan,
    planned: &PlannedComponent,
    volumes: &dyn VolumeTree,
    force: bool,
) -> Result<Outcome> {
    let component = &planned.component;
    let Some(source) = &planned.source else {
        return Err(Error::ComponentNotInBackup {
            id: plan.target.id.clone(),
            component: component.clone(),
        });
    };
    let destination = volumes.component_path(component)?;

    let status = check_artifact(&source.archive);
    let checksum = match status {
        ArtifactStatus::Ok => ChecksumStatus::Verified,
        ArtifactStatus::MissingChecksum => {
            debug!(%component, "No checksum file; restoring unchecked");
            ChecksumStatus::Absent
        }
        ArtifactStatus::Mismatch { .. } | ArtifactStatus::MalformedChecksum if force => {
            warn!(%component, ?status, "Archive failed its checksum; restoring anyway");
            ChecksumStatus::ForcedMismatch
        }
        _ => {
            return Err(status
                .to_error(&source.archive)
                .unwrap_or(Error::VerificationFailed {
                    id: source.backup_id.clone(),
                }))
        }
    };

    let prepare_err = |source: std::io::Error| Error::PrepareDestination {
        path: destination.clone(),
        source,
    };
    if path_has_data(&destination).map_err(prepare_err)? && !force {
        let error = Error::DestinationNotEmpty {
            path: destination.clone(),
        };
        return Ok(Outcome::Skipped(SkippedComponent {
            component: component.clone(),
            destination,
            category: error.category(),
            message: error.to_string(),
        }));
    }
    prepare_destination(&destination).map_err(prepare_err)?;
    let stats = extract_archive(&source.archive, &destination)?;
    Ok(Outcome::Restored(RestoredComponent {
        component: component.clone(),
        source: source.clone(),
        destination,
        checksum,
        stats,
    }))
}

/// Make `destination` an empty directory, keeping the directory itself if
/// it exists.
///
/// A symlink to a directory is followed: the target is emptied and the
/// link kept, since backups read the volume through the same link.
fn prepare_destination(destination: &Path) -> std::io::Result<()> {
    match fs::metadata(destination) {
        Ok(metadata) if metadata.is_dir() => clear_directory(destination),
        Ok(_) => {
            fs::remove_file(destination)?;
            fs::create_dir_all(destination)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if fs::symlink_metadata(destination).is_ok() {
                // Dangling link.
                fs::remove_file(destination)?;
            }
            fs::create_dir_all(destination)
        }
        Err(err) => Err(err),
    }
}
