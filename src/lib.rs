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

//! Stowage: full and incremental backups of a deployment's configuration
//! and container data volumes.
//!
//! Each backup is a directory under the backup root holding one gzipped
//! tarball per component, a SHA-256 checksum beside each tarball, and a
//! metadata file that seals it. Incremental backups name a parent full
//! backup and store only the volumes that changed since it.

pub mod backup;
pub mod backup_id;
pub mod backup_type;
pub mod change;
pub mod clock;
pub mod component;
pub mod config;
pub mod counters;
pub mod engine;
pub mod errors;
pub mod excludes;
pub mod hash;
mod io;
mod jsonio;
pub mod kind;
pub mod live_tree;
pub mod lock;
pub mod manifest;
pub mod monitor;
pub mod record;
pub mod repository;
pub mod restore;
pub mod retention;
pub mod tarball;
pub mod test_fixtures;
pub mod verify;
pub mod volumes;

pub use crate::backup::{backup, BackupOptions, BackupOutcome};
pub use crate::backup_id::BackupId;
pub use crate::backup_type::BackupType;
pub use crate::change::ChangeDecision;
pub use crate::clock::{Clock, SystemClock};
pub use crate::component::Component;
pub use crate::config::Config;
pub use crate::counters::Counter;
pub use crate::engine::Engine;
pub use crate::errors::{error_chain_message, ComponentFailure, Error, ErrorCategory, Result};
pub use crate::excludes::Exclude;
pub use crate::hash::Sha256Hash;
pub use crate::kind::Kind;
pub use crate::lock::WriteLock;
pub use crate::monitor::Monitor;
pub use crate::record::BackupRecord;
pub use crate::repository::{Inventory, Repository};
pub use crate::restore::{plan_restore, restore, RestoreOptions, RestorePlan, RestoreReport};
pub use crate::retention::{prune, PruneOptions, PruneReport};
pub use crate::verify::{verify_backup, VerifyReport};
pub use crate::volumes::{LocalVolumes, VolumeTree};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SYMLINKS_SUPPORTED: bool = cfg!(target_family = "unix");
