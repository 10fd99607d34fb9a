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

//! Incremental backups: change detection and lineage.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use stowage::test_fixtures::ScratchDeployment;
use stowage::*;

fn names<'a>(components: impl IntoIterator<Item = &'a Component>) -> Vec<String> {
    components.into_iter().map(|c| c.to_string()).collect()
}

#[test]
fn only_changed_volume_is_archived() {
    let sd = ScratchDeployment::new(&["a", "b"]);
    sd.write_volume_file("a", "f", b"x");
    sd.write_volume_file("b", "f", b"y");
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();

    sd.write_volume_file("a", "f", b"x2");
    sd.clock().advance_days(1);
    let incr = engine.create_incremental(None, None, false).unwrap();

    assert!(incr.is_clean());
    assert_eq!(incr.backup_type, BackupType::Incremental);
    assert_eq!(incr.parent.as_ref(), Some(&full.id));
    assert_eq!(names(incr.archived_components()), ["config", "volume:a"]);
    assert_eq!(names(&incr.unchanged), ["volume:b"]);
    let change = incr.archived[1].change.as_ref().unwrap();
    assert_matches!(change, ChangeDecision::Changed(diff) if diff.modified == 1 && diff.added == 0);
    sd.test_monitor().assert_counter(Counter::VolumesUnchanged, 1);

    let record = engine.repository().find(&incr.id).unwrap();
    assert_eq!(record.parent, Some(full.id));
    assert_eq!(names(&record.components), ["config", "volume:a"]);
}

#[test]
fn unchanged_deployment_archives_only_config() {
    let sd = ScratchDeployment::new(&["a", "b"]);
    sd.write_volume_file("a", "f", b"x");
    let engine = sd.engine();
    engine.create_full(None, false).unwrap();

    for _ in 0..2 {
        let incr = engine.create_incremental(None, None, false).unwrap();
        assert_eq!(names(incr.archived_components()), ["config"]);
        assert_eq!(names(&incr.unchanged), ["volume:a", "volume:b"]);
    }
}

#[test]
fn added_and_removed_files_are_changes() {
    let sd = ScratchDeployment::new(&["a"]);
    sd.write_volume_file("a", "old", b"1");
    let engine = sd.engine();
    engine.create_full(None, false).unwrap();

    std::fs::remove_file(sd.volume_path("a").join("old")).unwrap();
    sd.write_volume_file("a", "sub/new", b"2");
    let incr = engine.create_incremental(None, None, false).unwrap();
    let change = incr.archived[1].change.clone().unwrap();
    assert_matches!(change, ChangeDecision::Changed(diff) if diff.added == 1 && diff.removed == 1);
}

#[test]
fn volume_missing_from_parent_is_new() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    // A volume that failed in the full backup has no artifact to compare with.
    std::fs::remove_dir_all(sd.volume_path("a")).unwrap();
    let broken_full = engine.create_full(None, false).unwrap();
    assert_eq!(broken_full.failed.len(), 1);

    std::fs::create_dir(sd.volume_path("a")).unwrap();
    sd.clock().advance_days(1);
    let incr = engine.create_incremental(None, None, false).unwrap();
    assert_eq!(incr.parent.as_ref(), Some(&broken_full.id));
    assert_eq!(incr.archived[1].change, Some(ChangeDecision::New));
}

#[test]
fn explicit_parent_is_used() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let first = engine.create_full(None, false).unwrap();
    sd.clock().advance_days(1);
    engine.create_full(None, false).unwrap();

    let incr = engine
        .create_incremental(None, Some(first.id.clone()), false)
        .unwrap();
    assert_eq!(incr.parent, Some(first.id));
}

#[test]
fn default_parent_is_latest_full() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    engine.create_full(None, false).unwrap();
    sd.clock().advance_days(1);
    let second = engine.create_full(None, false).unwrap();
    sd.clock().advance_days(1);
    let incr = engine.create_incremental(None, None, false).unwrap();
    assert_eq!(incr.parent, Some(second.id));
}

#[test]
fn incremental_without_any_full_fails() {
    let sd = ScratchDeployment::new(&["a"]);
    let err = sd
        .engine()
        .create_incremental(None, None, false)
        .unwrap_err();
    assert_matches!(err, Error::NoFullBackup);
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(!sd.backup_root().join("incremental").exists());
}

#[test]
fn missing_parent_is_a_validation_error() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    engine.create_full(None, false).unwrap();
    let err = engine
        .create_incremental(None, Some(BackupId::new("nonesuch").unwrap()), false)
        .unwrap_err();
    assert_matches!(err, Error::ParentNotFound { .. });
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[test]
fn incremental_parent_is_rejected() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    engine.create_full(None, false).unwrap();
    let incr = engine.create_incremental(None, None, false).unwrap();
    let err = engine
        .create_incremental(None, Some(incr.id), false)
        .unwrap_err();
    assert_matches!(err, Error::ParentNotFull { .. });
    assert_eq!(err.category(), ErrorCategory::Validation);
}
