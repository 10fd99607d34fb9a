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

//! Pruning with lineage protection, driven by a manual clock.

use pretty_assertions::assert_eq;

use stowage::retention::{RetainReason, RetainedBackup};
use stowage::test_fixtures::ScratchDeployment;
use stowage::*;

#[test]
fn full_with_live_incremental_survives_until_it_goes() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    sd.clock().advance_days(35);
    let incr = engine.create_incremental(None, None, false).unwrap();

    let report = engine.prune(BackupType::Full, 30).unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(
        report.retained,
        [RetainedBackup {
            id: full.id.clone(),
            reason: RetainReason::Dependents {
                dependents: vec![incr.id.clone()],
            },
        }]
    );
    assert!(engine.repository().find(&full.id).is_ok());

    sd.clock().advance_days(8);
    let report = engine.prune(BackupType::Incremental, 7).unwrap();
    assert_eq!(report.deleted, [incr.id]);

    let report = engine.prune(BackupType::Full, 30).unwrap();
    assert_eq!(report.deleted, [full.id.clone()]);
    assert!(engine.repository().find(&full.id).is_err());
    assert!(!sd
        .backup_root()
        .join("full")
        .join(full.id.as_str())
        .exists());
}

#[test]
fn backup_prunes_its_own_type() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let old = engine.create_full(None, false).unwrap();
    sd.clock().advance_days(31);
    let new = engine.create_full(None, false).unwrap();

    let prune = new.prune.as_ref().unwrap();
    assert_eq!(prune.backup_type, BackupType::Full);
    assert_eq!(prune.retention_days, 30);
    assert_eq!(prune.deleted, [old.id]);
    let remaining: Vec<BackupId> = engine
        .list()
        .unwrap()
        .records
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, [new.id]);
}

#[test]
fn zero_retention_disables_automatic_pruning() {
    let sd = ScratchDeployment::new(&["a"]);
    let mut config = sd.config().clone();
    config.retention.full_days = Some(0);
    let engine = Engine::with_parts(
        config.clone(),
        Box::new(LocalVolumes::from_config(&config).unwrap()),
        Box::new(sd.clock().clone()),
        sd.monitor(),
    )
    .unwrap();
    engine.create_full(None, false).unwrap();
    sd.clock().advance_days(400);
    let outcome = engine.create_full(None, false).unwrap();
    assert!(outcome.prune.is_none());
    assert_eq!(engine.list().unwrap().records.len(), 2);
}

#[test]
fn recent_backups_are_kept() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    engine.create_full(None, false).unwrap();
    sd.clock().advance_days(29);
    let report = engine.prune(BackupType::Full, 30).unwrap();
    assert!(report.deleted.is_empty());
    assert!(report.retained.is_empty());
    sd.test_monitor().assert_counter(Counter::BackupsDeleted, 0);
}

#[test]
fn dry_run_reports_without_deleting() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();
    sd.clock().advance_days(31);
    let report = engine
        .prune_with_options(BackupType::Full, 30, &PruneOptions { dry_run: true })
        .unwrap();
    assert_eq!(report.deleted, [full.id.clone()]);
    assert!(engine.repository().find(&full.id).is_ok());
}
