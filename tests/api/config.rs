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

//! Engines built from configuration files.

use std::fs;

use assert_matches::assert_matches;
use indoc::indoc;
use tempfile::TempDir;

use stowage::monitor::test::TestMonitor;
use stowage::*;

#[test]
fn engine_from_file_with_relative_paths() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("etc")).unwrap();
    fs::write(root.join("etc/app.conf"), b"x = 1\n").unwrap();
    fs::create_dir_all(root.join("vols/db")).unwrap();
    fs::write(root.join("vols/db/data"), b"rows").unwrap();
    fs::write(root.join("vols/db/scratch.tmp"), b"ignore me").unwrap();
    let config_path = root.join("stowage.toml");
    fs::write(
        &config_path,
        indoc! {r#"
            backup_root = "backups"
            config_dir = "etc"
            volumes_root = "vols"
            hostname = "testbox"

            [[volumes]]
            name = "db"
            exclude = ["*.tmp"]
        "#},
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    let engine = Engine::new(config, TestMonitor::arc()).unwrap();
    let outcome = engine.create_full(None, true).unwrap();

    assert!(outcome.is_clean());
    let record = engine.repository().find(&outcome.id).unwrap();
    assert_eq!(record.hostname, "testbox");
    assert!(record.verified);
    assert!(root
        .join("backups/full")
        .join(outcome.id.as_str())
        .join("volumes/db.tar.gz")
        .is_file());
    let db = &outcome.archived[1];
    assert_eq!(db.stats.file_bytes, 4);
}

#[test]
fn unknown_keys_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("stowage.toml");
    fs::write(
        &config_path,
        "backup_root = \"/b\"\nconfig_dir = \"/c\"\nbackup_rot = \"/typo\"\n",
    )
    .unwrap();
    let err = Config::load(&config_path).unwrap_err();
    assert_matches!(err, Error::ParseConfig { .. });
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = TempDir::new().unwrap();
    let err = Config::load(&tmp.path().join("absent.toml")).unwrap_err();
    assert_matches!(err, Error::ReadConfig { .. });
    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn encryption_flag_is_refused_at_backup() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("etc")).unwrap();
    let mut config = Config::new(&tmp.path().join("b"), &tmp.path().join("etc"));
    config.encrypt = true;
    let engine = Engine::new(config, TestMonitor::arc()).unwrap();
    let err = engine.create_full(None, false).unwrap_err();
    assert_matches!(err, Error::EncryptionUnsupported);
}
