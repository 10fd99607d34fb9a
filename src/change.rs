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

//! Decide whether an incremental backup must archive a volume again.
//!
//! The granularity is the whole volume: any difference in any file causes
//! the entire volume to be archived.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::manifest::{Manifest, ManifestDiff};
use crate::*;

/// What to do with one volume in an incremental backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ChangeDecision {
    /// Not present in the parent: archive it.
    New,
    /// Identical to the parent: don't archive; restore takes it from the parent.
    Unchanged,
    /// Differs from the parent: archive the whole volume.
    Changed(ManifestDiff),
    /// The comparison couldn't be completed, so archive the volume anyway.
    ForcedFull { reason: String },
}

impl ChangeDecision {
    /// True if the volume must be archived.
    pub fn needs_archive(&self) -> bool {
        !matches!(self, ChangeDecision::Unchanged)
    }
}

impl fmt::Display for ChangeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeDecision::New => write!(f, "new"),
            ChangeDecision::Unchanged => write!(f, "unchanged"),
            ChangeDecision::Changed(diff) => write!(
                f,
                "changed ({} added, {} removed, {} modified)",
                diff.added, diff.removed, diff.modified
            ),
            ChangeDecision::ForcedFull { reason } => write!(f, "forced full: {reason}"),
        }
    }
}

/// Compare a live volume with its archive in the parent backup.
///
/// `parent_archive` is None if the parent has no artifact for this volume.
/// This never fails: if either side can't be hashed, the result is
/// [ChangeDecision::ForcedFull].
#[instrument(skip(exclude, monitor))]
pub fn detect_change(
    volume: &str,
    live_root: &Path,
    exclude: &Exclude,
    parent_archive: Option<&Path>,
    monitor: &dyn Monitor,
) -> ChangeDecision {
    let Some(parent_archive) = parent_archive else {
        debug!(volume, "Volume is not in the parent backup");
        return ChangeDecision::New;
    };
    let manifests = Manifest::of_tree(live_root, exclude, monitor).and_then(|live| {
        Manifest::of_archive(parent_archive, exclude).map(|stored| (stored, live))
    });
    let decision = match manifests {
        Ok((stored, live)) if stored == live => ChangeDecision::Unchanged,
        Ok((stored, live)) => ChangeDecision::Changed(stored.diff(&live)),
        Err(err) => {
            warn!(volume, ?err, "Can't compare volume with parent; archiving it in full");
            ChangeDecision::ForcedFull {
                reason: err.to_string(),
            }
        }
    };
    debug!(volume, %decision);
    decision
}
