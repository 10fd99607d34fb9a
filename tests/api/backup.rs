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

//! Making full backups through the engine.

use std::fs;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;

use stowage::test_fixtures::ScratchDeployment;
use stowage::*;

#[test]
fn full_backup_layout_on_disk() {
    let sd = ScratchDeployment::new(&["db", "web"]);
    sd.write_volume_file("db", "data/table", b"rows");
    sd.write_volume_file("web", "index.html", b"<html>");
    let engine = sd.engine();
    let id = BackupId::new("nightly-1").unwrap();

    let outcome = engine.create_full(Some(id.clone()), false).unwrap();

    assert_eq!(outcome.id, id);
    assert!(outcome.is_clean());
    let dir = sd.backup_root().join("full").join("nightly-1");
    for name in [
        "config.tar.gz",
        "config.tar.gz.sha256",
        "volumes/db.tar.gz",
        "volumes/db.tar.gz.sha256",
        "volumes/web.tar.gz",
        "volumes/web.tar.gz.sha256",
        "backup-metadata.json",
    ] {
        assert!(dir.join(name).is_file(), "{name} is missing");
    }
    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("backup-metadata.json")).unwrap())
            .unwrap();
    assert_eq!(
        metadata,
        json!({
            "timestamp": "2026-01-15T12:00:00Z",
            "type": "full",
            "parent": null,
            "components": ["config", "volume:db", "volume:web"],
            "hostname": "scratch",
            "compression_level": 6,
            "encrypted": false,
            "verified": false,
        })
    );
    assert!(!sd.backup_root().join("LOCK").exists());
}

#[test]
fn checksum_file_names_its_archive() {
    let sd = ScratchDeployment::new(&["db"]);
    let outcome = sd.engine().create_full(None, false).unwrap();
    let dir = sd.backup_root().join("full").join(outcome.id.as_str());
    let text = fs::read_to_string(dir.join("volumes/db.tar.gz.sha256")).unwrap();
    let archived = outcome
        .archived
        .iter()
        .find(|a| a.component == Component::volume("db").unwrap())
        .unwrap();
    assert_eq!(text, format!("{}  db.tar.gz\n", archived.checksum));
}

#[test]
fn duplicate_id_is_refused() {
    let sd = ScratchDeployment::new(&["db"]);
    let engine = sd.engine();
    let id = BackupId::new("once").unwrap();
    engine.create_full(Some(id.clone()), false).unwrap();
    let err = engine.create_full(Some(id.clone()), false).unwrap_err();
    assert_matches!(err, Error::DuplicateBackupId { .. });
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[test]
fn generated_ids_are_distinct() {
    let sd = ScratchDeployment::new(&["db"]);
    let engine = sd.engine();
    let a = engine.create_full(None, false).unwrap().id;
    let b = engine.create_full(None, false).unwrap().id;
    assert_ne!(a, b);
    assert_eq!(engine.list().unwrap().records.len(), 2);
}

#[test]
fn verify_after_backup_sets_flag() {
    let sd = ScratchDeployment::new(&["db"]);
    sd.write_volume_file("db", "f", b"contents");
    let engine = sd.engine();
    let outcome = engine.create_full(None, true).unwrap();
    let verification = outcome.verification.as_ref().unwrap();
    assert!(verification.verified);
    assert_eq!(verification.artifacts.len(), 2);
    assert!(engine.repository().find(&outcome.id).unwrap().verified);
}

#[test]
fn excluded_files_are_not_archived() {
    let sd = ScratchDeployment::new(&[]);
    let volume_dir = sd.config().backup_root.with_file_name("cache");
    fs::create_dir(&volume_dir).unwrap();
    fs::write(volume_dir.join("keep"), b"k").unwrap();
    fs::write(volume_dir.join("drop.tmp"), b"d").unwrap();
    let mut config = sd.config().clone().with_volume("cache", &volume_dir);
    config.volumes[0].exclude = vec!["*.tmp".to_owned()];
    let engine = Engine::with_parts(
        config.clone(),
        Box::new(LocalVolumes::from_config(&config).unwrap()),
        Box::new(sd.clock().clone()),
        sd.monitor(),
    )
    .unwrap();

    let outcome = engine.create_full(None, false).unwrap();
    let cache = outcome
        .archived
        .iter()
        .find(|a| a.component == Component::volume("cache").unwrap())
        .unwrap();
    assert_eq!(cache.stats.file_bytes, 1);
}

#[test]
fn counters_are_reported_to_monitor() {
    let sd = ScratchDeployment::new(&["a", "b"]);
    sd.write_volume_file("a", "f", b"1234");
    sd.engine().create_full(None, false).unwrap();
    let monitor = sd.test_monitor();
    monitor.assert_counter(Counter::ComponentsArchived, 3);
    monitor.assert_counter(Counter::ComponentsFailed, 0);
    assert!(monitor.get_counter(Counter::ArchivedFileBytes) >= 4);
    monitor.assert_no_errors();
}
