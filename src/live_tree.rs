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

//! Find the entries of a live tree on the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::*;

/// An entry found in a live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the tree root, `/`-separated, like `a/b.txt`.
    pub relative: String,
    /// Full path on the local filesystem.
    pub path: PathBuf,
    pub kind: Kind,
}

/// Convert a path below the tree root into its `/`-separated relative form.
pub(crate) fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/")
}

/// List everything under `root`, excluding the root itself, in sorted order.
///
/// Symlinks are reported as symlinks and never followed. Excluded
/// directories are not descended into. Entries of unknown kind are skipped.
pub fn walk_tree(root: &Path, exclude: &Exclude) -> Result<Vec<TreeEntry>> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(Error::SourceNotDirectory {
                path: root.to_owned(),
            })
        }
        Err(source) => {
            return Err(Error::OpenTree {
                path: root.to_owned(),
                source,
            })
        }
    }
    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(root) {
            Ok(rel) => !exclude.matches(&relative_name(rel)),
            Err(_) => true,
        });
    for entry in walker {
        let entry = entry.map_err(|source| Error::WalkTree {
            path: root.to_owned(),
            source,
        })?;
        let kind = Kind::from(entry.file_type());
        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => relative_name(rel),
            Err(_) => continue,
        };
        if kind == Kind::Unknown {
            debug!(?relative, "Skip entry of unknown kind");
            continue;
        }
        trace!(?relative, ?kind);
        entries.push(TreeEntry {
            relative,
            path: entry.into_path(),
            kind,
        });
    }
    Ok(entries)
}
