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

//! The backup root: a directory per backup type, holding a directory per
//! backup.
//!
//! ```text
//! <root>/
//!   LOCK
//!   full/<id>/
//!     backup-metadata.json
//!     config.tar.gz
//!     config.tar.gz.sha256
//!     volumes/<name>.tar.gz
//!     volumes/<name>.tar.gz.sha256
//!   incremental/<id>/
//!     ...
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

use crate::io::WriteMode;
use crate::jsonio::{read_json, write_json};
use crate::record::{Metadata, METADATA_FILENAME};
use crate::*;

const VOLUMES_DIR: &str = "volumes";
const CONFIG_ARCHIVE: &str = "config.tar.gz";
const ARCHIVE_EXTENSION: &str = "tar.gz";

/// A backup directory that was never sealed with metadata: interrupted,
/// or still being written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteBackup {
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub name: String,
}

/// A backup directory whose metadata can't be read or doesn't make sense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamagedBackup {
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub name: String,
    pub category: ErrorCategory,
    pub message: String,
}

/// Everything found in the backup root.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    /// Sealed backups, oldest first.
    pub records: Vec<BackupRecord>,
    pub incomplete: Vec<IncompleteBackup>,
    pub damaged: Vec<DamagedBackup>,
}

impl Inventory {
    /// Sealed backups of one type, oldest first.
    pub fn of_type(&self, backup_type: BackupType) -> impl Iterator<Item = &BackupRecord> {
        self.records
            .iter()
            .filter(move |r| r.backup_type == backup_type)
    }

    /// Incremental backups that name `parent` as their parent.
    pub fn dependents_of<'a>(
        &'a self,
        parent: &'a BackupId,
    ) -> impl Iterator<Item = &'a BackupRecord> {
        self.of_type(BackupType::Incremental)
            .filter(move |r| r.parent.as_ref() == Some(parent))
    }

    /// The most recently created full backup.
    pub fn latest_full(&self) -> Option<&BackupRecord> {
        self.of_type(BackupType::Full).last()
    }
}

/// A backup root directory.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Open a backup root, which need not exist yet.
    pub fn open(root: &Path) -> Repository {
        Repository {
            root: root.to_owned(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn type_dir(&self, backup_type: BackupType) -> PathBuf {
        self.root.join(backup_type.dir_name())
    }

    pub fn backup_dir(&self, backup_type: BackupType, id: &BackupId) -> PathBuf {
        self.type_dir(backup_type).join(id.as_str())
    }

    pub fn metadata_path(&self, backup_type: BackupType, id: &BackupId) -> PathBuf {
        self.backup_dir(backup_type, id).join(METADATA_FILENAME)
    }

    /// Path of the archive holding a component of a backup.
    pub fn artifact_path(
        &self,
        backup_type: BackupType,
        id: &BackupId,
        component: &Component,
    ) -> PathBuf {
        let dir = self.backup_dir(backup_type, id);
        match component {
            Component::Config => dir.join(CONFIG_ARCHIVE),
            Component::Volume(name) => dir
                .join(VOLUMES_DIR)
                .join(format!("{name}.{ARCHIVE_EXTENSION}")),
        }
    }

    /// Path of a component's archive in a sealed backup.
    pub fn record_artifact_path(&self, record: &BackupRecord, component: &Component) -> PathBuf {
        self.artifact_path(record.backup_type, &record.id, component)
    }

    /// True if there's a directory for this id under either type, sealed or
    /// not.
    pub fn contains(&self, id: &BackupId) -> bool {
        BackupType::iter().any(|t| self.backup_dir(t, id).exists())
    }

    /// Create the directory for a new backup, including its `volumes`
    /// subdirectory.
    ///
    /// Fails if the id is already used by a backup of either type.
    #[instrument(skip(self))]
    pub fn create_backup_dir(&self, backup_type: BackupType, id: &BackupId) -> Result<PathBuf> {
        if self.contains(id) {
            return Err(Error::DuplicateBackupId { id: id.clone() });
        }
        let type_dir = self.type_dir(backup_type);
        crate::io::ensure_dir_exists(&type_dir).map_err(|source| Error::CreateBackupDir {
            path: type_dir.clone(),
            source,
        })?;
        let dir = self.backup_dir(backup_type, id);
        fs::create_dir(&dir).map_err(|source| {
            if source.kind() == ErrorKind::AlreadyExists {
                Error::DuplicateBackupId { id: id.clone() }
            } else {
                Error::CreateBackupDir {
                    path: dir.clone(),
                    source,
                }
            }
        })?;
        let volumes_dir = dir.join(VOLUMES_DIR);
        fs::create_dir(&volumes_dir).map_err(|source| Error::CreateBackupDir {
            path: volumes_dir,
            source,
        })?;
        debug!(?dir, "Created backup directory");
        Ok(dir)
    }

    /// Seal a backup by writing its metadata.
    ///
    /// Fails rather than replace existing metadata.
    pub fn write_record(&self, record: &BackupRecord) -> Result<()> {
        write_json(
            &self.metadata_path(record.backup_type, &record.id),
            &record.to_metadata(),
            WriteMode::CreateNew,
        )
    }

    /// Rewrite the verified flag of a sealed backup, returning the updated
    /// record.
    pub fn set_verified(&self, record: &BackupRecord, verified: bool) -> Result<BackupRecord> {
        let mut record = record.clone();
        record.verified = verified;
        write_json(
            &self.metadata_path(record.backup_type, &record.id),
            &record.to_metadata(),
            WriteMode::Overwrite,
        )?;
        Ok(record)
    }

    /// Read the record of a sealed backup of a known type.
    pub fn read_record(&self, backup_type: BackupType, id: &BackupId) -> Result<BackupRecord> {
        let path = self.metadata_path(backup_type, id);
        let metadata: Metadata = read_json(&path)?;
        BackupRecord::from_metadata(id.clone(), backup_type, metadata, &path)
    }

    /// Find a sealed backup of either type.
    ///
    /// Returns [Error::BackupNotFound] if there's no sealed backup with this id.
    pub fn find(&self, id: &BackupId) -> Result<BackupRecord> {
        for backup_type in BackupType::iter() {
            match self.read_record(backup_type, id) {
                Ok(record) => return Ok(record),
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::BackupNotFound { id: id.clone() })
    }

    /// List every backup directory in the root.
    ///
    /// A missing root or type directory just has no backups.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Inventory> {
        let mut inventory = Inventory::default();
        for backup_type in BackupType::iter() {
            self.list_type(backup_type, &mut inventory)?;
        }
        inventory
            .records
            .sort_by(|a, b| (a.timestamp, &a.id).cmp(&(b.timestamp, &b.id)));
        Ok(inventory)
    }

    fn list_type(&self, backup_type: BackupType, inventory: &mut Inventory) -> Result<()> {
        let type_dir = self.type_dir(backup_type);
        let list_err = |source: std::io::Error| Error::ListBackups {
            path: type_dir.clone(),
            source,
        };
        let read_dir = match fs::read_dir(&type_dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(list_err(err)),
        };
        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(list_err)?;
            if entry.file_type().map_err(list_err)?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        for name in names {
            let damaged = |err: Error| DamagedBackup {
                backup_type,
                name: name.clone(),
                category: err.category(),
                message: err.to_string(),
            };
            let id = match BackupId::new(&name) {
                Ok(id) => id,
                Err(err) => {
                    warn!(?name, ?backup_type, "Unexpected directory in backup root");
                    inventory.damaged.push(damaged(err));
                    continue;
                }
            };
            match self.read_record(backup_type, &id) {
                Ok(record) => inventory.records.push(record),
                Err(err) if err.is_not_found() => {
                    debug!(?name, ?backup_type, "Backup is incomplete");
                    inventory.incomplete.push(IncompleteBackup {
                        backup_type,
                        name: name.clone(),
                    })
                }
                Err(err) => {
                    warn!(?name, ?backup_type, ?err, "Backup metadata is damaged");
                    inventory.damaged.push(damaged(err));
                }
            }
        }
        Ok(())
    }

    /// Delete a backup's record and all its artifacts.
    ///
    /// The metadata goes first, so an interrupted deletion leaves an
    /// incomplete directory rather than a sealed backup missing artifacts.
    #[instrument(skip(self))]
    pub fn delete_backup(&self, backup_type: BackupType, id: &BackupId) -> Result<()> {
        let dir = self.backup_dir(backup_type, id);
        let delete_err = |source: std::io::Error| Error::DeleteBackup {
            path: dir.clone(),
            source,
        };
        match fs::remove_file(self.metadata_path(backup_type, id)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(delete_err(err)),
        }
        fs::remove_dir_all(&dir).map_err(delete_err)?;
        info!(%id, %backup_type, "Deleted backup");
        Ok(())
    }
}
