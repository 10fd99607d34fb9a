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

//! The operations offered to callers such as the command line or a
//! scheduler, bound to one deployment's configuration.

use std::sync::Arc;

use crate::backup::{backup, BackupOptions, BackupOutcome};
use crate::lock::WriteLock;
use crate::repository::Inventory;
use crate::restore::{restore, RestoreOptions, RestoreReport};
use crate::retention::{prune, PruneOptions, PruneReport};
use crate::verify::{verify_backup, VerifyReport};
use crate::*;

/// A configured backup engine for one deployment.
pub struct Engine {
    config: Config,
    repo: Repository,
    volumes: Box<dyn VolumeTree>,
    clock: Box<dyn Clock>,
    monitor: Arc<dyn Monitor>,
}

impl Engine {
    /// Construct an engine over local volumes and the system clock.
    pub fn new(config: Config, monitor: Arc<dyn Monitor>) -> Result<Engine> {
        let volumes = LocalVolumes::from_config(&config)?;
        Engine::with_parts(config, Box::new(volumes), Box::new(SystemClock), monitor)
    }

    /// Construct an engine with a given volume provider and clock.
    pub fn with_parts(
        config: Config,
        volumes: Box<dyn VolumeTree>,
        clock: Box<dyn Clock>,
        monitor: Arc<dyn Monitor>,
    ) -> Result<Engine> {
        config.validate()?;
        let repo = Repository::open(&config.backup_root);
        Ok(Engine {
            config,
            repo,
            volumes,
            clock,
            monitor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn backup_options(&self, backup_type: BackupType) -> BackupOptions {
        BackupOptions {
            backup_type,
            compression_level: self.config.compression_level,
            encrypt: self.config.encrypt,
            hostname: self.config.hostname(),
            retention_days: self.config.retention.days(backup_type),
            ..BackupOptions::default()
        }
    }

    fn run_backup(&self, options: BackupOptions) -> Result<BackupOutcome> {
        backup(
            &self.repo,
            self.volumes.as_ref(),
            self.clock.as_ref(),
            &options,
            self.monitor.clone(),
        )
    }

    /// Back up the configuration and every volume.
    pub fn create_full(&self, id: Option<BackupId>, verify: bool) -> Result<BackupOutcome> {
        self.run_backup(BackupOptions {
            id,
            verify,
            ..self.backup_options(BackupType::Full)
        })
    }

    /// Back up the configuration and the volumes that changed since a full
    /// backup: `parent`, or by default the most recent.
    pub fn create_incremental(
        &self,
        id: Option<BackupId>,
        parent: Option<BackupId>,
        verify: bool,
    ) -> Result<BackupOutcome> {
        self.run_backup(BackupOptions {
            id,
            parent,
            verify,
            ..self.backup_options(BackupType::Incremental)
        })
    }

    /// Check a backup's archives against their checksums.
    pub fn verify(&self, id: &BackupId) -> Result<VerifyReport> {
        verify_backup(&self.repo, id, self.monitor.clone())
    }

    /// Restore a backup, or some of its components, onto the live volumes
    /// and configuration tree.
    pub fn restore(
        &self,
        id: &BackupId,
        components: Option<Vec<Component>>,
        force: bool,
    ) -> Result<RestoreReport> {
        restore(
            &self.repo,
            self.volumes.as_ref(),
            id,
            &RestoreOptions { components, force },
            self.monitor.clone(),
        )
    }

    /// List all backups in the root, including incomplete and damaged ones.
    pub fn list(&self) -> Result<Inventory> {
        self.repo.list()
    }

    /// Delete backups of a type older than `retention_days`.
    pub fn prune(&self, backup_type: BackupType, retention_days: u32) -> Result<PruneReport> {
        self.prune_with_options(backup_type, retention_days, &PruneOptions::default())
    }

    pub fn prune_with_options(
        &self,
        backup_type: BackupType,
        retention_days: u32,
        options: &PruneOptions,
    ) -> Result<PruneReport> {
        prune(
            &self.repo,
            backup_type,
            retention_days,
            self.clock.now(),
            options,
            self.monitor.clone(),
        )
    }

    /// Remove a lock left behind by a process that has exited.
    pub fn break_lock(&self) -> Result<()> {
        WriteLock::remove_stale(self.repo.root())
    }
}
