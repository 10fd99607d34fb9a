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

//! Check stored archives against their recorded checksums.
//!
//! Verification never deletes or moves a damaged backup: it records the
//! result in the backup's `verified` flag and reports which artifacts are
//! bad.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::hash::{checksum_path, hash_file, read_checksum_file};
use crate::lock::WriteLock;
use crate::*;

/// Outcome of checking one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// The archive's hash matches its checksum file.
    Ok,
    Mismatch {
        expected: Sha256Hash,
        actual: Sha256Hash,
    },
    MissingArchive,
    MissingChecksum,
    MalformedChecksum,
    /// The archive or checksum exists but couldn't be read.
    Unreadable { message: String },
}

impl ArtifactStatus {
    pub fn is_ok(&self) -> bool {
        *self == ArtifactStatus::Ok
    }

    /// Convert a bad status into the corresponding error.
    pub fn to_error(&self, archive_path: &Path) -> Option<Error> {
        let path = archive_path.to_owned();
        match self {
            ArtifactStatus::Ok => None,
            ArtifactStatus::Mismatch { expected, actual } => Some(Error::ChecksumMismatch {
                path,
                expected: *expected,
                actual: *actual,
            }),
            ArtifactStatus::MissingArchive => Some(Error::ReadArchive {
                path,
                source: std::io::ErrorKind::NotFound.into(),
            }),
            ArtifactStatus::MissingChecksum => Some(Error::ReadChecksum {
                path: checksum_path(archive_path),
                source: std::io::ErrorKind::NotFound.into(),
            }),
            ArtifactStatus::MalformedChecksum => Some(Error::MalformedChecksum {
                path: checksum_path(archive_path),
            }),
            ArtifactStatus::Unreadable { message } => Some(Error::ReadArchive {
                path,
                source: std::io::Error::other(message.clone()),
            }),
        }
    }
}

/// Check an archive against its checksum file.
pub fn check_artifact(archive_path: &Path) -> ArtifactStatus {
    if !archive_path.exists() {
        return ArtifactStatus::MissingArchive;
    }
    let expected = match read_checksum_file(archive_path) {
        Ok(hash) => hash,
        Err(err) if err.is_not_found() => return ArtifactStatus::MissingChecksum,
        Err(Error::MalformedChecksum { .. }) => return ArtifactStatus::MalformedChecksum,
        Err(err) => {
            return ArtifactStatus::Unreadable {
                message: error_chain_message(&err),
            }
        }
    };
    match hash_file(archive_path) {
        Ok(actual) if actual == expected => ArtifactStatus::Ok,
        Ok(actual) => ArtifactStatus::Mismatch { expected, actual },
        Err(err) if err.is_not_found() => ArtifactStatus::MissingArchive,
        Err(err) => ArtifactStatus::Unreadable {
            message: error_chain_message(&err),
        },
    }
}

/// Result of checking one artifact of a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCheck {
    pub component: Component,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

/// Result of verifying a whole backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub id: BackupId,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    /// True if every artifact matched its checksum.
    pub verified: bool,
    pub artifacts: Vec<ArtifactCheck>,
}

impl VerifyReport {
    /// Artifacts that did not match.
    pub fn damaged(&self) -> impl Iterator<Item = &ArtifactCheck> {
        self.artifacts.iter().filter(|a| !a.status.is_ok())
    }
}

/// Verify every artifact of a backup and record the result in its
/// `verified` flag.
///
/// Takes the lock on the backup root.
pub fn verify_backup(
    repo: &Repository,
    id: &BackupId,
    monitor: Arc<dyn Monitor>,
) -> Result<VerifyReport> {
    let _lock = WriteLock::acquire(repo.root())?;
    verify_locked(repo, id, monitor)
}

/// Verify a backup while the caller holds the lock.
#[instrument(skip(repo, monitor))]
pub(crate) fn verify_locked(
    repo: &Repository,
    id: &BackupId,
    monitor: Arc<dyn Monitor>,
) -> Result<VerifyReport> {
    let record = repo.find(id)?;
    // The config archive belongs in every backup, even if writing it failed.
    let mut components = record.components.clone();
    if !components.contains(&Component::Config) {
        components.insert(0, Component::Config);
    }
    let task = monitor.start_task(format!("Verify {id}"));
    task.set_total(components.len());
    let mut artifacts = Vec::new();
    for component in &components {
        let path = repo.record_artifact_path(&record, component);
        let status = check_artifact(&path);
        if let Some(err) = status.to_error(&path) {
            warn!(%id, %component, ?status, "Artifact failed verification");
            monitor.count(Counter::ArtifactsDamaged, 1);
            monitor.error(err);
        } else {
            monitor.count(Counter::ArtifactsVerified, 1);
        }
        task.increment(1);
        artifacts.push(ArtifactCheck {
            component: component.clone(),
            path,
            status,
        });
    }
    let verified = artifacts.iter().all(|a| a.status.is_ok());
    if record.verified != verified {
        repo.set_verified(&record, verified)?;
    }
    if verified {
        info!(%id, "Backup verified");
    } else {
        warn!(%id, "Backup failed verification");
    }
    Ok(VerifyReport {
        id: record.id,
        backup_type: record.backup_type,
        verified,
        artifacts,
    })
}
