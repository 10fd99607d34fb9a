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

//! Utilities to set up test environments.
//!
//! Fixtures that create directories will be automatically deleted when the object
//! is deleted.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::config::VolumeConfig;
use crate::monitor::test::TestMonitor;
use crate::*;

/// A temporary tree for running a test.
///
/// Created in a temporary directory and automatically disposed when done.
pub struct TreeFixture {
    pub root: PathBuf,
    _tempdir: TempDir, // held only for cleanup
}

impl TreeFixture {
    pub fn new() -> TreeFixture {
        let tempdir = TempDir::new().unwrap();
        let root = tempdir.path().to_path_buf();
        TreeFixture {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Make a file in the tree, with arbitrary contents. Returns the full path.
    pub fn create_file(&self, relative_path: &str) -> PathBuf {
        self.create_file_with_contents(relative_path, b"contents")
    }

    /// Make a file in the tree, with given contents. Returns the full path.
    pub fn create_file_with_contents(&self, relative_path: &str, contents: &[u8]) -> PathBuf {
        let full_path = self.root.join(relative_path);
        let mut f = fs::File::create(&full_path).unwrap();
        f.write_all(contents).unwrap();
        full_path
    }

    pub fn create_dir(&self, relative_path: &str) {
        fs::create_dir(self.root.join(relative_path)).unwrap();
    }

    #[cfg(unix)]
    pub fn create_symlink(&self, relative_path: &str, target: &str) {
        use std::os::unix::fs as unix_fs;

        unix_fs::symlink(target, self.root.join(relative_path)).unwrap();
    }

    /// Symlinks are just not present on Windows.
    #[cfg(windows)]
    pub fn create_symlink(&self, _relative_path: &str, _target: &str) {}

    #[cfg(unix)]
    pub fn make_file_unreadable(&self, relative_path: &str) {
        use std::os::unix::fs::PermissionsExt;
        let p = self.root.join(relative_path);
        fs::set_permissions(&p, fs::Permissions::from_mode(0)).unwrap();
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one and give another to
/// the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> ManualClock {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new(datetime!(2026-01-15 12:00 UTC))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

/// A temporary deployment: a configuration tree, some volumes, and an empty
/// backup root, all in one temporary directory.
///
/// ```text
/// <tmp>/backup/
/// <tmp>/config/app.conf
/// <tmp>/volumes/<name>/
/// ```
pub struct ScratchDeployment {
    _tempdir: TempDir, // held only for cleanup
    config: Config,
    repo: Repository,
    volumes: LocalVolumes,
    clock: ManualClock,
    monitor: Arc<TestMonitor>,
}

impl ScratchDeployment {
    /// Make a deployment with the named volumes, each initially empty.
    pub fn new(volume_names: &[&str]) -> ScratchDeployment {
        let tempdir = TempDir::new().unwrap();
        let root = tempdir.path();
        let backup_root = root.join("backup");
        let config_dir = root.join("config");
        let volumes_root = root.join("volumes");
        fs::create_dir(&config_dir).unwrap();
        fs::write(config_dir.join("app.conf"), b"listen = 8080\n").unwrap();
        let mut config = Config::new(&backup_root, &config_dir);
        config.volumes_root = Some(volumes_root.clone());
        config.hostname = Some("scratch".to_owned());
        for name in volume_names {
            fs::create_dir_all(volumes_root.join(name)).unwrap();
            config.volumes.push(VolumeConfig {
                name: (*name).to_owned(),
                path: None,
                exclude: Vec::new(),
            });
        }
        config.validate().unwrap();
        let volumes = LocalVolumes::from_config(&config).unwrap();
        ScratchDeployment {
            repo: Repository::open(&backup_root),
            _tempdir: tempdir,
            config,
            volumes,
            clock: ManualClock::default(),
            monitor: TestMonitor::arc(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backup_root(&self) -> &Path {
        &self.config.backup_root
    }

    pub fn config_path(&self) -> &Path {
        &self.config.config_dir
    }

    pub fn volume_path(&self, name: &str) -> PathBuf {
        self.volumes.volume_path(name).unwrap()
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn volumes(&self) -> &dyn VolumeTree {
        &self.volumes
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn monitor(&self) -> Arc<dyn Monitor> {
        self.monitor.clone()
    }

    pub fn test_monitor(&self) -> &TestMonitor {
        &self.monitor
    }

    /// Write a file into a volume, creating parent directories.
    pub fn write_volume_file(&self, volume: &str, relative_path: &str, contents: &[u8]) {
        let path = self.volume_path(volume).join(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read_volume_file(&self, volume: &str, relative_path: &str) -> Vec<u8> {
        fs::read(self.volume_path(volume).join(relative_path)).unwrap()
    }

    /// An engine over this deployment, sharing its clock and monitor.
    pub fn engine(&self) -> Engine {
        Engine::with_parts(
            self.config.clone(),
            Box::new(self.volumes.clone()),
            Box::new(self.clock.clone()),
            self.monitor.clone(),
        )
        .unwrap()
    }
}
