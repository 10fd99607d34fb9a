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

//! Restore from full and incremental backups.

use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use stowage::manifest::Manifest;
use stowage::monitor::void::VoidMonitor;
use stowage::restore::ChecksumStatus;
use stowage::test_fixtures::ScratchDeployment;
use stowage::*;

use super::flip_byte;

fn manifest_of(path: &Path) -> Manifest {
    Manifest::of_tree(path, &Exclude::nothing(), &VoidMonitor).unwrap()
}

fn volume(name: &str) -> Component {
    Component::volume(name).unwrap()
}

#[test]
fn full_backup_round_trip() {
    let sd = ScratchDeployment::new(&["a"]);
    sd.write_volume_file("a", "f1", b"hello");
    sd.write_volume_file("a", "sub/f2", b"world");
    let before = manifest_of(&sd.volume_path("a"));
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();

    fs::remove_dir_all(sd.volume_path("a")).unwrap();
    let report = engine.restore(&full.id, Some(vec![volume("a")]), false).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.restored.len(), 1);
    let restored = &report.restored[0];
    assert_eq!(restored.checksum, ChecksumStatus::Verified);
    assert_eq!(restored.source.backup_id, full.id);
    assert_eq!(restored.destination, sd.volume_path("a"));
    assert_eq!(sd.read_volume_file("a", "f1"), b"hello");
    let after = manifest_of(&sd.volume_path("a"));
    assert_eq!(before, after);
    sd.test_monitor().assert_counter(Counter::ComponentsRestored, 1);
}

#[test]
fn incremental_restore_combines_parent() {
    let sd = ScratchDeployment::new(&["a", "b"]);
    sd.write_volume_file("a", "f", b"x");
    sd.write_volume_file("b", "f", b"y");
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    sd.write_volume_file("a", "f", b"x2");
    sd.clock().advance_days(1);
    let incr = engine.create_incremental(None, None, false).unwrap();

    let plan = plan_restore(engine.repository(), &incr.id, None).unwrap();
    let sources: Vec<(String, BackupId)> = plan
        .components
        .iter()
        .map(|p| {
            (
                p.component.to_string(),
                p.source.as_ref().unwrap().backup_id.clone(),
            )
        })
        .collect();
    assert_eq!(
        sources,
        [
            ("config".to_owned(), incr.id.clone()),
            ("volume:a".to_owned(), incr.id.clone()),
            ("volume:b".to_owned(), full.id.clone()),
        ]
    );

    fs::remove_dir_all(sd.volume_path("a")).unwrap();
    fs::remove_dir_all(sd.volume_path("b")).unwrap();
    fs::remove_dir_all(sd.config_path()).unwrap();
    let report = engine.restore(&incr.id, None, false).unwrap();
    assert!(report.is_complete(), "{report:#?}");
    assert_eq!(report.restored.len(), 3);
    assert_eq!(sd.read_volume_file("a", "f"), b"x2");
    assert_eq!(sd.read_volume_file("b", "f"), b"y");
    assert!(sd.config_path().join("app.conf").is_file());
}

#[test]
fn populated_destination_is_skipped_without_force() {
    let sd = ScratchDeployment::new(&["a"]);
    sd.write_volume_file("a", "f", b"backed up");
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    sd.write_volume_file("a", "f", b"live");
    sd.write_volume_file("a", "stale", b"junk");

    let report = engine.restore(&full.id, Some(vec![volume("a")]), false).unwrap();
    assert!(!report.is_complete());
    assert!(report.restored.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].category, ErrorCategory::Conflict);
    assert_eq!(sd.read_volume_file("a", "f"), b"live");
    assert!(sd.volume_path("a").join("stale").exists());
    sd.test_monitor().assert_counter(Counter::ComponentsSkipped, 1);
}

#[test]
fn force_replaces_populated_destination() {
    let sd = ScratchDeployment::new(&["a"]);
    sd.write_volume_file("a", "f", b"backed up");
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    sd.write_volume_file("a", "f", b"live");
    sd.write_volume_file("a", "stale", b"junk");

    let report = engine.restore(&full.id, Some(vec![volume("a")]), true).unwrap();
    assert!(report.is_complete());
    assert_eq!(sd.read_volume_file("a", "f"), b"backed up");
    assert!(!sd.volume_path("a").join("stale").exists());
}

#[cfg(unix)]
#[test]
fn symlinked_volume_is_restored_through_the_link() {
    let sd = ScratchDeployment::new(&["a"]);
    let link = sd.volume_path("a");
    let real = link.parent().unwrap().parent().unwrap().join("real_a");
    fs::create_dir(&real).unwrap();
    fs::remove_dir(&link).unwrap();
    std::os::unix::fs::symlink(&real, &link).unwrap();
    fs::write(real.join("f1"), b"through the link").unwrap();
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    assert!(full.is_clean());

    fs::remove_file(real.join("f1")).unwrap();
    let report = engine.restore(&full.id, Some(vec![volume("a")]), false).unwrap();
    assert!(report.is_complete(), "{report:#?}");
    assert!(report.skipped.is_empty());
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(real.join("f1")).unwrap(), b"through the link");

    fs::write(real.join("f1"), b"changed").unwrap();
    let report = engine.restore(&full.id, Some(vec![volume("a")]), true).unwrap();
    assert_eq!(report.restored.len(), 1);
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(real.join("f1")).unwrap(), b"through the link");
}

#[test]
fn corrupt_archive_is_not_restored() {
    let sd = ScratchDeployment::new(&["a"]);
    sd.write_volume_file("a", "f", b"some data to compress");
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    let record = engine.repository().find(&full.id).unwrap();
    flip_byte(&engine.repository().record_artifact_path(&record, &volume("a")));
    fs::remove_dir_all(sd.volume_path("a")).unwrap();

    let report = engine.restore(&full.id, Some(vec![volume("a")]), false).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_matches!(report.failed[0].error, Error::ChecksumMismatch { .. });
    assert_eq!(report.failed[0].error.category(), ErrorCategory::Verification);
    assert!(!sd.volume_path("a").exists());
    assert_eq!(sd.test_monitor().take_errors().len(), 1);
}

#[test]
fn unknown_component_fails_alone() {
    let sd = ScratchDeployment::new(&["a"]);
    sd.write_volume_file("a", "f", b"x");
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    fs::remove_dir_all(sd.volume_path("a")).unwrap();

    let report = engine
        .restore(&full.id, Some(vec![volume("zzz"), volume("a")]), false)
        .unwrap();
    assert_eq!(report.restored.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].component, volume("zzz"));
    assert_matches!(report.failed[0].error, Error::ComponentNotInBackup { .. });
    assert_eq!(sd.read_volume_file("a", "f"), b"x");
}

#[test]
fn restore_of_missing_backup_fails() {
    let sd = ScratchDeployment::new(&["a"]);
    let err = sd
        .engine()
        .restore(&BackupId::new("nothing").unwrap(), None, false)
        .unwrap_err();
    assert_matches!(err, Error::BackupNotFound { .. });
}

#[test]
fn restore_refuses_incremental_with_missing_parent() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    let incr = engine.create_incremental(None, None, false).unwrap();
    engine
        .repository()
        .delete_backup(BackupType::Full, &full.id)
        .unwrap();
    let err = engine.restore(&incr.id, None, true).unwrap_err();
    assert_matches!(err, Error::ParentNotFound { .. });
    assert_eq!(err.category(), ErrorCategory::Validation);
}
