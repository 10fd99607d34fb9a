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

//! Make a full or incremental backup of the configuration tree and every
//! defined volume.
//!
//! A failure to archive one component is recorded and the run continues.
//! The run as a whole fails only if the backup root can't be locked, the
//! backup directory can't be created, or the metadata can't be written.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::change::{detect_change, ChangeDecision};
use crate::config::DEFAULT_COMPRESSION_LEVEL;
use crate::lock::WriteLock;
use crate::retention::{prune_locked, PruneOptions, PruneReport};
use crate::tarball::{write_archive, ArchiveStats, MAX_COMPRESSION_LEVEL};
use crate::verify::{verify_locked, VerifyReport};
use crate::*;

/// Configuration of how to make a backup.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub backup_type: BackupType,
    /// Use this id rather than generating one.
    pub id: Option<BackupId>,
    /// For an incremental, the parent full backup; by default the most
    /// recent one.
    pub parent: Option<BackupId>,
    /// Verify the new backup's checksums once it's sealed.
    pub verify: bool,
    /// gzip level, 0-9.
    pub compression_level: u32,
    /// Encryption at rest is not supported, so this must be false.
    pub encrypt: bool,
    /// Hostname recorded in the metadata.
    pub hostname: String,
    /// After the backup, prune backups of the same type older than this.
    pub retention_days: Option<u32>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        BackupOptions {
            backup_type: BackupType::Full,
            id: None,
            parent: None,
            verify: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            encrypt: false,
            hostname: String::new(),
            retention_days: None,
        }
    }
}

/// A component stored in the new backup.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedComponent {
    pub component: Component,
    pub checksum: Sha256Hash,
    pub stats: ArchiveStats,
    /// Why an incremental backup archived this volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeDecision>,
}

/// A step after sealing the backup, verification or pruning, that failed.
///
/// These don't undo the backup.
#[derive(Debug, Serialize)]
pub struct FollowUpFailure {
    pub step: &'static str,
    pub category: ErrorCategory,
    pub message: String,
}

impl FollowUpFailure {
    fn new(step: &'static str, error: &Error) -> FollowUpFailure {
        FollowUpFailure {
            step,
            category: error.category(),
            message: error_chain_message(error),
        }
    }
}

/// Result of a backup run.
#[derive(Debug, Serialize)]
pub struct BackupOutcome {
    pub id: BackupId,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub parent: Option<BackupId>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub archived: Vec<ArchivedComponent>,
    /// Volumes unchanged since the parent, and so not archived.
    pub unchanged: Vec<Component>,
    pub failed: Vec<ComponentFailure>,
    pub verification: Option<VerifyReport>,
    pub prune: Option<PruneReport>,
    pub follow_up_failures: Vec<FollowUpFailure>,
}

impl BackupOutcome {
    /// True if every component was handled, and any requested verification
    /// and pruning succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && self.follow_up_failures.is_empty()
            && self.verification.as_ref().map_or(true, |v| v.verified)
            && self.prune.as_ref().map_or(true, |p| p.failed.is_empty())
    }

    pub fn archived_components(&self) -> impl Iterator<Item = &Component> {
        self.archived.iter().map(|a| &a.component)
    }
}

/// Make a backup.
///
/// The id is generated from the clock's time and a random suffix unless one
/// is given.
#[instrument(skip_all, fields(backup_type = %options.backup_type))]
pub fn backup(
    repo: &Repository,
    volumes: &dyn VolumeTree,
    clock: &dyn Clock,
    options: &BackupOptions,
    monitor: Arc<dyn Monitor>,
) -> Result<BackupOutcome> {
    if options.encrypt {
        return Err(Error::EncryptionUnsupported);
    }
    if options.compression_level > MAX_COMPRESSION_LEVEL {
        return Err(Error::InvalidConfig {
            details: format!(
                "compression_level {} is not between 0 and {MAX_COMPRESSION_LEVEL}",
                options.compression_level
            ),
        });
    }
    let _lock = WriteLock::acquire(repo.root())?;
    let timestamp = clock.now();
    let id = match &options.id {
        Some(id) => id.clone(),
        None => BackupId::generate(timestamp, &mut rand::thread_rng()),
    };
    if repo.contains(&id) {
        return Err(Error::DuplicateBackupId { id });
    }
    let parent = resolve_parent(repo, &id, options)?;
    let parent_id = parent.as_ref().map(|p| p.id.clone());
    let dir = repo.create_backup_dir(options.backup_type, &id)?;
    info!(%id, ?parent_id, ?dir, "Start backup");

    let mut outcome = BackupOutcome {
        id: id.clone(),
        backup_type: options.backup_type,
        parent: parent_id.clone(),
        timestamp,
        archived: Vec::new(),
        unchanged: Vec::new(),
        failed: Vec::new(),
        verification: None,
        prune: None,
        follow_up_failures: Vec::new(),
    };

    let mut work = vec![Component::Config];
    for name in volumes.volume_names() {
        work.push(Component::volume(&name)?);
    }
    for component in work {
        let task = monitor.start_task(format!("Back up {component}"));
        let result = archive_component(
            repo,
            volumes,
            &id,
            parent.as_ref(),
            &component,
            options,
            monitor.as_ref(),
        );
        match result {
            Ok(Some(archived)) => {
                monitor.count(Counter::ComponentsArchived, 1);
                monitor.count(Counter::ArchivedEntries, archived.stats.entries as usize);
                monitor.count(Counter::ArchivedFileBytes, archived.stats.file_bytes as usize);
                monitor.count(Counter::ArchiveBytes, archived.stats.archive_bytes as usize);
                outcome.archived.push(archived);
            }
            Ok(None) => {
                monitor.count(Counter::VolumesUnchanged, 1);
                outcome.unchanged.push(component);
            }
            Err(error) => {
                warn!(%component, ?error, "Failed to archive component");
                monitor.count(Counter::ComponentsFailed, 1);
                let failure = ComponentFailure { component, error };
                monitor.error(failure.summary());
                outcome.failed.push(failure);
            }
        }
        task.increment(1);
    }

    let record = BackupRecord {
        id: id.clone(),
        backup_type: options.backup_type,
        timestamp,
        parent: parent_id,
        components: outcome.archived_components().cloned().collect(),
        hostname: options.hostname.clone(),
        compression_level: options.compression_level,
        encrypted: false,
        verified: false,
    };
    fail::fail_point!("backup::write-metadata", |_| Err(Error::WriteMetadata {
        path: repo.metadata_path(record.backup_type, &id),
        source: std::io::Error::other("injected failure"),
    }));
    repo.write_record(&record)?;
    info!(
        %id,
        archived = outcome.archived.len(),
        unchanged = outcome.unchanged.len(),
        failed = outcome.failed.len(),
        "Backup sealed"
    );

    if options.verify {
        match verify_locked(repo, &id, monitor.clone()) {
            Ok(report) => outcome.verification = Some(report),
            Err(err) => {
                warn!(?err, "Verification after backup failed");
                outcome.follow_up_failures.push(FollowUpFailure::new("verify", &err));
                monitor.error(err);
            }
        }
    }
    if let Some(days) = options.retention_days {
        let now = clock.now();
        let result = prune_locked(
            repo,
            options.backup_type,
            days,
            now,
            &PruneOptions::default(),
            monitor.clone(),
        );
        match result {
            Ok(report) => outcome.prune = Some(report),
            Err(err) => {
                warn!(?err, "Pruning after backup failed");
                outcome.follow_up_failures.push(FollowUpFailure::new("prune", &err));
                monitor.error(err);
            }
        }
    }
    Ok(outcome)
}

/// Find and check the parent of a new backup.
fn resolve_parent(
    repo: &Repository,
    id: &BackupId,
    options: &BackupOptions,
) -> Result<Option<BackupRecord>> {
    match (options.backup_type, &options.parent) {
        (BackupType::Full, None) => Ok(None),
        (BackupType::Full, Some(parent)) => Err(Error::UnexpectedParent {
            id: id.clone(),
            parent: parent.clone(),
        }),
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
            Ok(Some(parent))
        }
        (BackupType::Incremental, None) => repo
            .list()?
            .latest_full()
            .cloned()
            .map(Some)
            .ok_or(Error::NoFullBackup),
    }
}

/// Archive one component, or return None if it's unchanged since the parent.
fn archive_component(
    repo: &Repository,
    volumes: &dyn VolumeTree,
    id: &BackupId,
    parent: Option<&BackupRecord>,
    component: &Component,
    options: &BackupOptions,
    monitor: &dyn Monitor,
) -> Result<Option<ArchivedComponent>> {
    let source = volumes.component_path(component)?;
    let exclude = match component {
        Component::Config => Exclude::nothing(),
        Component::Volume(name) => volumes.exclude(name)?,
    };
    let change = match (component, parent) {
        (Component::Volume(name), Some(parent)) => {
            let parent_archive = parent
                .has_component(component)
                .then(|| repo.record_artifact_path(parent, component));
            let decision =
                detect_change(name, &source, &exclude, parent_archive.as_deref(), monitor);
            if !decision.needs_archive() {
                debug!(%component, "Unchanged since parent");
                return Ok(None);
            }
            Some(decision)
        }
        _ => None,
    };
    let archive_path = repo.artifact_path(options.backup_type, id, component);
    let written = write_archive(&source, &archive_path, &exclude, options.compression_level)?;
    Ok(Some(ArchivedComponent {
        component: component.clone(),
        checksum: written.checksum,
        stats: written.stats,
        change,
    }))
}
