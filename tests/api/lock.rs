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

//! Mutual exclusion on the backup root.

use assert_matches::assert_matches;

use stowage::test_fixtures::ScratchDeployment;
use stowage::*;

#[test]
fn operations_are_refused_while_locked() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let full = engine.create_full(None, false).unwrap();

    let lock = WriteLock::acquire(sd.backup_root()).unwrap();
    let err = engine.create_full(None, false).unwrap_err();
    assert_matches!(err, Error::LockHeld { .. });
    assert_eq!(err.category(), ErrorCategory::Conflict);
    assert_matches!(engine.verify(&full.id), Err(Error::LockHeld { .. }));
    assert_matches!(
        engine.restore(&full.id, None, true),
        Err(Error::LockHeld { .. })
    );
    assert_matches!(
        engine.prune(BackupType::Full, 1),
        Err(Error::LockHeld { .. })
    );
    // Listing only reads.
    assert_eq!(engine.list().unwrap().records.len(), 1);

    lock.release().unwrap();
    engine.create_full(None, false).unwrap();
}

#[test]
fn break_lock_clears_a_stale_lock() {
    let sd = ScratchDeployment::new(&["a"]);
    let engine = sd.engine();
    let lock = WriteLock::acquire(sd.backup_root()).unwrap();
    std::mem::forget(lock);
    assert!(engine.create_full(None, false).is_err());

    engine.break_lock().unwrap();
    engine.create_full(None, false).unwrap();
}
