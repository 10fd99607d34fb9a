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

//! Backup records: the description of one sealed backup.
//!
//! A record is stored as `backup-metadata.json` inside the backup's
//! directory. The id is not stored in the file: it's the name of the
//! directory, and the type must match the directory the backup is in.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::*;

/// Name of the metadata file that seals a backup.
pub const METADATA_FILENAME: &str = "backup-metadata.json";

/// Description of a sealed backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub id: BackupId,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// The full backup this one is based on; present iff this is incremental.
    pub parent: Option<BackupId>,
    /// Components with an artifact stored in this backup, in the order they
    /// were archived.
    pub components: Vec<Component>,
    pub hostname: String,
    pub compression_level: u32,
    pub encrypted: bool,
    pub verified: bool,
}

/// On-disk form of [BackupRecord].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Metadata {
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    backup_type: BackupType,
    parent: Option<BackupId>,
    components: Vec<Component>,
    #[serde(default)]
    hostname: String,
    compression_level: u32,
    #[serde(default)]
    encrypted: bool,
    #[serde(default)]
    verified: bool,
}

impl BackupRecord {
    /// Check the lineage fields agree with the backup type.
    pub fn check_lineage(&self) -> Result<()> {
        match (self.backup_type, &self.parent) {
            (BackupType::Full, Some(parent)) => Err(Error::UnexpectedParent {
                id: self.id.clone(),
                parent: parent.clone(),
            }),
            (BackupType::Incremental, None) => Err(Error::MissingParent {
                id: self.id.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn has_component(&self, component: &Component) -> bool {
        self.components.contains(component)
    }

    /// Names of the volumes archived in this backup.
    pub fn volume_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().filter_map(Component::volume_name)
    }

    pub(crate) fn to_metadata(&self) -> Metadata {
        Metadata {
            timestamp: self.timestamp,
            backup_type: self.backup_type,
            parent: self.parent.clone(),
            components: self.components.clone(),
            hostname: self.hostname.clone(),
            compression_level: self.compression_level,
            encrypted: self.encrypted,
            verified: self.verified,
        }
    }

    /// Reconstruct a record from its metadata, found in the directory for
    /// `dir_type` backups under the name `id`.
    pub(crate) fn from_metadata(
        id: BackupId,
        dir_type: BackupType,
        metadata: Metadata,
        path: &Path,
    ) -> Result<BackupRecord> {
        if metadata.backup_type != dir_type {
            return Err(Error::InvalidMetadata {
                path: path.to_owned(),
                details: format!(
                    "type {} does not match its directory {:?}",
                    metadata.backup_type,
                    dir_type.dir_name()
                ),
            });
        }
        let record = BackupRecord {
            id,
            backup_type: metadata.backup_type,
            timestamp: metadata.timestamp,
            parent: metadata.parent,
            components: metadata.components,
            hostname: metadata.hostname,
            compression_level: metadata.compression_level,
            encrypted: metadata.encrypted,
            verified: metadata.verified,
        };
        record.check_lineage()?;
        Ok(record)
    }
}
