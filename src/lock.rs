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

//! A lock file in the backup root, excluding other processes from creating,
//! verifying, pruning or restoring backups at the same time.
//!
//! The lock is a file created with create-new semantics, holding JSON that
//! identifies the process that took it. It's removed when the lock is
//! dropped. A process that dies while holding the lock leaves it behind; it
//! can be removed with [WriteLock::break_lock] once the operator is sure the
//! owner has gone.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument, trace, warn};

use crate::io::{ensure_dir_exists, write_file_entire, WriteMode};
use crate::jsonio::read_json;
use crate::*;

pub static LOCK_FILENAME: &str = "LOCK";

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockContent {
    /// Hostname of the process holding the lock.
    pub host: String,
    pub pid: u32,
    /// Stowage version of the holder.
    pub client_version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub taken: OffsetDateTime,
}

impl LockContent {
    fn describe(&self) -> String {
        format!(
            "pid {} on {} (stowage {}) since {}",
            self.pid, self.host, self.client_version, self.taken
        )
    }
}

/// An exclusive lock on a backup root, released when dropped.
#[derive(Debug)]
pub struct WriteLock {
    path: PathBuf,
    released: bool,
}

impl WriteLock {
    /// Take the lock, creating the backup root if necessary.
    ///
    /// Returns [Error::LockHeld] if another process holds it.
    #[instrument]
    pub fn acquire(root: &Path) -> Result<WriteLock> {
        let path = root.join(LOCK_FILENAME);
        ensure_dir_exists(root).map_err(|source| Error::CreateBackupDir {
            path: root.to_owned(),
            source,
        })?;
        let content = LockContent {
            host: hostname::get()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
            pid: std::process::id(),
            client_version: crate::VERSION.to_owned(),
            taken: OffsetDateTime::now_utc(),
        };
        let mut json = serde_json::to_string(&content).map_err(|source| Error::SerializeJson {
            path: path.clone(),
            source,
        })?;
        json.push('\n');
        match write_file_entire(&path, json.as_bytes(), WriteMode::CreateNew) {
            Ok(()) => {
                trace!(?path, "Took lock");
                Ok(WriteLock {
                    path,
                    released: false,
                })
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let holder = match WriteLock::peek(root) {
                    Ok(Some(content)) => content.describe(),
                    Ok(None) => "a process that has just released it".to_owned(),
                    Err(err) => {
                        debug!(?err, "Failed to read lock content");
                        "an unknown process".to_owned()
                    }
                };
                Err(Error::LockHeld { path, holder })
            }
            Err(source) => Err(Error::Io { source }),
        }
    }

    /// Remove any existing lock, then take it.
    ///
    /// Use this only if you're confident that the process owning the lock
    /// has terminated and the lock is stale.
    pub fn break_lock(root: &Path) -> Result<WriteLock> {
        WriteLock::remove_stale(root)?;
        WriteLock::acquire(root)
    }

    /// Remove a stale lock, if there is one.
    pub fn remove_stale(root: &Path) -> Result<()> {
        let path = root.join(LOCK_FILENAME);
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!(?path, "Broke lock");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Io { source }),
        }
    }

    /// Return information about the current lock holder, if any.
    pub fn peek(root: &Path) -> Result<Option<LockContent>> {
        match read_json(&root.join(LOCK_FILENAME)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Explicitly release the lock.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(Error::from)
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(err) = fs::remove_file(&self.path) {
                // Print directly to stderr, in case tracing is in a bad state
                // during unwind.
                eprintln!("Failed to delete {:?} from Drop: {err:?}", self.path);
            }
        }
    }
}
