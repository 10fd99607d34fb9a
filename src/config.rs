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

//! Deployment configuration: where backups go, what to back up, and how
//! long to keep it.
//!
//! A `Config` is built once, from a TOML file or in code, and then passed by
//! reference. Relative paths in a file are resolved against the directory
//! containing that file.
//!
//! ```toml
//! backup_root = "/srv/backups"
//! config_dir = "/etc/deployment"
//! volumes_root = "/var/lib/volumes"
//! compression_level = 6
//!
//! [retention]
//! full_days = 30
//! incremental_days = 7
//!
//! [[volumes]]
//! name = "db"
//! exclude = ["/pg_wal", "*.tmp"]
//!
//! [[volumes]]
//! name = "uploads"
//! path = "/srv/uploads"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tarball::MAX_COMPRESSION_LEVEL;
use crate::*;

pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
pub const DEFAULT_FULL_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_INCREMENTAL_RETENTION_DAYS: u32 = 7;

/// Deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding all backups.
    pub backup_root: PathBuf,
    /// The deployment's configuration tree, archived in every backup.
    pub config_dir: PathBuf,
    /// Default parent directory of volumes that don't give their own path.
    #[serde(default)]
    pub volumes_root: Option<PathBuf>,
    /// gzip level, 0-9.
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Request encryption at rest, which is not supported.
    #[serde(default)]
    pub encrypt: bool,
    /// Name recorded in backups; defaults to the system hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

/// How long to keep backups of each type, in days.
///
/// `None`, or zero in a config file, disables automatic pruning after a
/// backup of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    #[serde(default = "default_full_days")]
    pub full_days: Option<u32>,
    #[serde(default = "default_incremental_days")]
    pub incremental_days: Option<u32>,
}

fn default_full_days() -> Option<u32> {
    Some(DEFAULT_FULL_RETENTION_DAYS)
}

fn default_incremental_days() -> Option<u32> {
    Some(DEFAULT_INCREMENTAL_RETENTION_DAYS)
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            full_days: default_full_days(),
            incremental_days: default_incremental_days(),
        }
    }
}

impl RetentionConfig {
    /// Retention window applied automatically after a backup of this type.
    pub fn days(&self, backup_type: BackupType) -> Option<u32> {
        match backup_type {
            BackupType::Full => self.full_days,
            BackupType::Incremental => self.incremental_days,
        }
        .filter(|days| *days > 0)
    }
}

/// One named data volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeConfig {
    pub name: String,
    /// Location of the volume; defaults to `volumes_root/<name>`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Globs of files inside the volume not to back up.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Config {
    /// Construct a configuration in code, with default settings and no
    /// volumes.
    pub fn new(backup_root: &Path, config_dir: &Path) -> Config {
        Config {
            backup_root: backup_root.to_owned(),
            config_dir: config_dir.to_owned(),
            volumes_root: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            encrypt: false,
            hostname: None,
            retention: RetentionConfig::default(),
            volumes: Vec::new(),
        }
    }

    /// Add a volume at an explicit path.
    pub fn with_volume(mut self, name: &str, path: &Path) -> Config {
        self.volumes.push(VolumeConfig {
            name: name.to_owned(),
            path: Some(path.to_owned()),
            exclude: Vec::new(),
        });
        self
    }

    /// Parse a configuration from TOML text. Relative paths are resolved
    /// against `base_dir`.
    pub fn from_toml(text: &str, source: &Path, base_dir: &Path) -> Result<Config> {
        let mut config: Config = toml::from_str(text).map_err(|source_err| Error::ParseConfig {
            path: source.to_owned(),
            source: source_err,
        })?;
        config.resolve_paths(base_dir);
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Config::from_toml(&text, path, base_dir)?;
        debug!(?path, volumes = config.volumes.len(), "Loaded configuration");
        Ok(config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        resolve(&mut self.backup_root);
        resolve(&mut self.config_dir);
        if let Some(root) = self.volumes_root.as_mut() {
            resolve(root);
        }
        for volume in &mut self.volumes {
            if let Some(path) = volume.path.as_mut() {
                resolve(path);
            }
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let invalid = |details: String| Err(Error::InvalidConfig { details });
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return invalid(format!(
                "compression_level {} is not between 0 and {MAX_COMPRESSION_LEVEL}",
                self.compression_level
            ));
        }
        let mut seen = HashSet::new();
        for volume in &self.volumes {
            if !component::valid_volume_name(&volume.name) {
                return invalid(format!("invalid volume name {:?}", volume.name));
            }
            if !seen.insert(volume.name.as_str()) {
                return invalid(format!("volume {:?} is defined twice", volume.name));
            }
            self.volume_path(volume)?;
            Exclude::from_patterns(&volume.exclude)?;
        }
        Ok(())
    }

    /// Location of a volume on disk.
    pub fn volume_path(&self, volume: &VolumeConfig) -> Result<PathBuf> {
        match (&volume.path, &self.volumes_root) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(root)) => Ok(root.join(&volume.name)),
            (None, None) => Err(Error::InvalidConfig {
                details: format!(
                    "volume {:?} has no path and there is no volumes_root",
                    volume.name
                ),
            }),
        }
    }

    /// The hostname to record in new backups.
    pub fn hostname(&self) -> String {
        match &self.hostname {
            Some(name) => name.clone(),
            None => hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}
