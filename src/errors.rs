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

//! Stowage error types.

use std::io;
use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use strum_macros::Display;
use thiserror::Error;

use crate::*;

/// Stowage specific error.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid backup id {id:?}")]
    InvalidBackupId { id: String },

    #[error("A backup with id {id} already exists")]
    DuplicateBackupId { id: BackupId },

    #[error("Backup {id} not found")]
    BackupNotFound { id: BackupId },

    #[error("No full backup exists to serve as the parent of an incremental backup")]
    NoFullBackup,

    #[error("Parent {parent} of backup {id} does not exist")]
    ParentNotFound { id: BackupId, parent: BackupId },

    #[error("Parent {parent} of backup {id} is not a full backup")]
    ParentNotFull { id: BackupId, parent: BackupId },

    #[error("Incremental backup {id} has no parent")]
    MissingParent { id: BackupId },

    #[error("Full backup {id} must not have a parent, but names {parent}")]
    UnexpectedParent { id: BackupId, parent: BackupId },

    #[error("Invalid component name {name:?}")]
    InvalidComponent { name: String },

    #[error("Volume {name:?} is not defined")]
    UnknownVolume { name: String },

    #[error("Component {component} is in neither backup {id} nor its parent")]
    ComponentNotInBackup { id: BackupId, component: Component },

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("Failed to parse configuration file {path:?}")]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read configuration file {path:?}")]
    ReadConfig { path: PathBuf, source: io::Error },

    #[error("Encryption at rest is not supported")]
    EncryptionUnsupported,

    #[error("Invalid metadata in {path:?}: {details}")]
    InvalidMetadata { path: PathBuf, details: String },

    #[error("Failed to deserialize json from {path:?}")]
    DeserializeJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize json for {path:?}")]
    SerializeJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to create backup directory {path:?}")]
    CreateBackupDir { path: PathBuf, source: io::Error },

    #[error("Failed to write metadata {path:?}")]
    WriteMetadata { path: PathBuf, source: io::Error },

    #[error("Failed to read metadata {path:?}")]
    ReadMetadata { path: PathBuf, source: io::Error },

    #[error("Failed to list backups in {path:?}")]
    ListBackups { path: PathBuf, source: io::Error },

    #[error("Failed to delete backup directory {path:?}")]
    DeleteBackup { path: PathBuf, source: io::Error },

    #[error("Failed to open tree {path:?}")]
    OpenTree { path: PathBuf, source: io::Error },

    #[error("Source tree {path:?} is not a directory")]
    SourceNotDirectory { path: PathBuf },

    #[error("Failed to walk tree {path:?}")]
    WalkTree {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to hash {path:?}")]
    HashFile { path: PathBuf, source: io::Error },

    #[error("Failed to write archive {path:?}")]
    WriteArchive { path: PathBuf, source: io::Error },

    #[error("Failed to read archive {path:?}")]
    ReadArchive { path: PathBuf, source: io::Error },

    #[error("Failed to write checksum {path:?}")]
    WriteChecksum { path: PathBuf, source: io::Error },

    #[error("Failed to read checksum {path:?}")]
    ReadChecksum { path: PathBuf, source: io::Error },

    #[error("Failed to prepare restore destination {path:?}")]
    PrepareDestination { path: PathBuf, source: io::Error },

    #[error("Failed to extract {archive:?} into {destination:?}")]
    Extract {
        archive: PathBuf,
        destination: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse exclusion glob")]
    ParseGlob {
        #[from]
        source: globset::Error,
    },

    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("Checksum mismatch on {path:?}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: Sha256Hash,
        actual: Sha256Hash,
    },

    #[error("Checksum file {path:?} is malformed")]
    MalformedChecksum { path: PathBuf },

    #[error("Backup {id} failed verification")]
    VerificationFailed { id: BackupId },

    #[error("{component} failed: {message}")]
    ComponentFailed {
        component: Component,
        category: ErrorCategory,
        message: String,
    },

    #[error("Destination {path:?} already contains data")]
    DestinationNotEmpty { path: PathBuf },

    #[error("Backup root {path:?} is locked by another process: {holder}")]
    LockHeld { path: PathBuf, holder: String },
}

/// The four broad classes of failure, used to summarize errors to callers.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input or inconsistent metadata: unresolvable parent, malformed
    /// records, unsupported chain depth.
    Validation,
    /// Filesystem or archive read/write failure.
    Io,
    /// A stored checksum does not match the artifact.
    Verification,
    /// The destination is already populated, or the root is locked.
    Conflict,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        use Error::*;
        match self {
            InvalidBackupId { .. }
            | DuplicateBackupId { .. }
            | BackupNotFound { .. }
            | NoFullBackup
            | ParentNotFound { .. }
            | ParentNotFull { .. }
            | MissingParent { .. }
            | UnexpectedParent { .. }
            | InvalidComponent { .. }
            | UnknownVolume { .. }
            | ComponentNotInBackup { .. }
            | InvalidConfig { .. }
            | ParseConfig { .. }
            | EncryptionUnsupported
            | InvalidMetadata { .. }
            | DeserializeJson { .. }
            | SerializeJson { .. }
            | ParseGlob { .. } => ErrorCategory::Validation,
            ChecksumMismatch { .. } | MalformedChecksum { .. } | VerificationFailed { .. } => {
                ErrorCategory::Verification
            }
            DestinationNotEmpty { .. } | LockHeld { .. } => ErrorCategory::Conflict,
            ComponentFailed { category, .. } => *category,
            ReadConfig { .. }
            | CreateBackupDir { .. }
            | WriteMetadata { .. }
            | ReadMetadata { .. }
            | ListBackups { .. }
            | DeleteBackup { .. }
            | OpenTree { .. }
            | SourceNotDirectory { .. }
            | WalkTree { .. }
            | HashFile { .. }
            | WriteArchive { .. }
            | ReadArchive { .. }
            | WriteChecksum { .. }
            | ReadChecksum { .. }
            | PrepareDestination { .. }
            | Extract { .. }
            | Io { .. } => ErrorCategory::Io,
        }
    }

    /// True if this error means the file or directory does not exist.
    pub fn is_not_found(&self) -> bool {
        use Error::*;
        match self {
            ReadMetadata { source, .. }
            | ReadArchive { source, .. }
            | ReadChecksum { source, .. }
            | OpenTree { source, .. }
            | HashFile { source, .. }
            | Io { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Describe an error followed by each of its sources.
pub fn error_chain_message(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A failure confined to one component of a backup or restore.
///
/// Serializes as `{component, category, message}`.
#[derive(Debug)]
pub struct ComponentFailure {
    pub component: Component,
    pub error: Error,
}

impl ComponentFailure {
    /// A copy of this failure as a single error, for reporting to a monitor.
    pub fn summary(&self) -> Error {
        Error::ComponentFailed {
            component: self.component.clone(),
            category: self.error.category(),
            message: error_chain_message(&self.error),
        }
    }
}

impl Serialize for ComponentFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ComponentFailure", 3)?;
        s.serialize_field("component", &self.component)?;
        s.serialize_field("category", &self.error.category())?;
        s.serialize_field("message", &error_chain_message(&self.error))?;
        s.end()
    }
}

/// Result type for Stowage library APIs.
pub type Result<T> = std::result::Result<T, Error>;
