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

//! Track counters of components, files, bytes and backups processed.
//!
//! Library code sets counters through the [Monitor](crate::monitor::Monitor)
//! interface.

#![warn(missing_docs)]

use std::fmt::{self, Debug};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;

use itertools::Itertools;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount, EnumIter};

/// Counters of events or bytes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumCount, EnumIter)]
pub enum Counter {
    /// Files whose content was hashed to detect changes.
    FilesHashed,
    /// Components (config or volumes) written to an archive.
    ComponentsArchived,
    /// Volumes found unchanged since the parent backup, and not archived.
    VolumesUnchanged,
    /// Components that failed to archive or restore.
    ComponentsFailed,
    /// Entries (files, directories, symlinks) stored in archives.
    ArchivedEntries,
    /// Total bytes in files stored in archives.
    ArchivedFileBytes,
    /// Total compressed bytes of archives written.
    ArchiveBytes,
    /// Artifacts whose checksum matched.
    ArtifactsVerified,
    /// Artifacts that were missing, or whose checksum didn't match.
    ArtifactsDamaged,
    /// Backups deleted by pruning.
    BackupsDeleted,
    /// Expired full backups kept because an incremental depends on them.
    BackupsRetained,
    /// Components extracted onto live storage.
    ComponentsRestored,
    /// Components not restored because the destination already had data.
    ComponentsSkipped,
    /// Total bytes in files extracted by restore.
    RestoredFileBytes,
}

/// Counter values, identified by a [Counter].
#[derive(Default)]
pub struct Counters {
    counters: [AtomicUsize; Counter::COUNT],
}

impl Counters {
    /// Increase the value for a given counter by an amount.
    pub fn count(&self, counter: Counter, increment: usize) {
        self.counters[counter as usize].fetch_add(increment, Relaxed);
    }

    /// Set the absolute value of a counter.
    pub fn set(&self, counter: Counter, value: usize) {
        self.counters[counter as usize].store(value, Relaxed);
    }

    /// Get the current value of a counter.
    pub fn get(&self, counter: Counter) -> usize {
        self.counters[counter as usize].load(Relaxed)
    }

    /// Return an iterator over counter, value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Counter, usize)> {
        Counter::iter()
            .map(move |c| (c, self.counters[c as usize].load(Relaxed)))
            .collect_vec()
            .into_iter()
    }
}

impl Debug for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Counters");
        for i in Counter::iter() {
            s.field(&format!("{i:?}"), &self.counters[i as usize].load(Relaxed));
        }
        s.finish()
    }
}
