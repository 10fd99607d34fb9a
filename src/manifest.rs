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

//! Sorted lists of (path, content hash) describing a volume's files.
//!
//! A manifest can be built either from a live tree on disk, or by streaming
//! through a stored archive, and the two are comparable: regular files hash
//! to the SHA-256 of their content, and symlinks to the SHA-256 of
//! `symlink:` followed by their target. Directories carry no content and are
//! not listed.

use std::fs;
use std::io;
use std::path::Path;

use itertools::{EitherOrBoth, Itertools};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{instrument, trace};

use crate::hash::{hash_file, hash_reader};
use crate::live_tree::{relative_name, walk_tree};
use crate::tarball::open_archive;
use crate::*;

/// One entry in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestEntry {
    pub path: String,
    pub hash: Sha256Hash,
}

/// A sorted list of content-bearing entries in a tree.
///
/// Two manifests are equal iff they hold identical (path, hash) sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

/// Differences between two manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified == 0
    }
}

fn symlink_hash(target: &Path) -> Sha256Hash {
    let mut bytes = b"symlink:".to_vec();
    bytes.extend_from_slice(target.to_string_lossy().as_bytes());
    Sha256Hash::of_bytes(&bytes)
}

impl Manifest {
    fn from_unsorted(mut entries: Vec<ManifestEntry>) -> Manifest {
        entries.sort_unstable();
        entries.dedup_by(|a, b| a.path == b.path);
        Manifest { entries }
    }

    /// Build a manifest of a live tree, hashing files in parallel.
    ///
    /// Fails if any file can't be read.
    #[instrument(skip(exclude, monitor))]
    pub fn of_tree(root: &Path, exclude: &Exclude, monitor: &dyn Monitor) -> Result<Manifest> {
        let tree_entries = walk_tree(root, exclude)?;
        let entries = tree_entries
            .par_iter()
            .filter(|entry| entry.kind.has_content())
            .map(|entry| {
                let hash = match entry.kind {
                    Kind::Symlink => {
                        let target = fs::read_link(&entry.path).map_err(|source| {
                            Error::HashFile {
                                path: entry.path.clone(),
                                source,
                            }
                        })?;
                        symlink_hash(&target)
                    }
                    _ => {
                        let hash = hash_file(&entry.path)?;
                        monitor.count(Counter::FilesHashed, 1);
                        hash
                    }
                };
                Ok(ManifestEntry {
                    path: entry.relative.clone(),
                    hash,
                })
            })
            .collect::<Result<Vec<ManifestEntry>>>()?;
        Ok(Manifest::from_unsorted(entries))
    }

    /// Build a manifest by reading through a stored archive.
    ///
    /// Entries matching `exclude` are left out, so that the result is
    /// comparable with [Manifest::of_tree] under the same exclusions.
    #[instrument(skip(exclude))]
    pub fn of_archive(archive_path: &Path, exclude: &Exclude) -> Result<Manifest> {
        let read_err = |source: io::Error| Error::ReadArchive {
            path: archive_path.to_owned(),
            source,
        };
        let mut archive = open_archive(archive_path)?;
        let mut entries = Vec::new();
        for entry in archive.entries().map_err(read_err)? {
            let mut entry = entry.map_err(read_err)?;
            let kind = Kind::from(entry.header().entry_type());
            if !kind.has_content() {
                continue;
            }
            let path = relative_name(&entry.path().map_err(read_err)?);
            if path.is_empty() || exclude.matches(&path) {
                continue;
            }
            let hash = if kind == Kind::Symlink {
                let target = entry
                    .link_name()
                    .map_err(read_err)?
                    .map(|t| t.into_owned())
                    .unwrap_or_default();
                symlink_hash(&target)
            } else {
                hash_reader(&mut entry).map_err(read_err)?
            };
            trace!(?path, %hash);
            entries.push(ManifestEntry { path, hash });
        }
        Ok(Manifest::from_unsorted(entries))
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count the entries added, removed and modified going from `self`
    /// to `other`.
    pub fn diff(&self, other: &Manifest) -> ManifestDiff {
        let mut diff = ManifestDiff::default();
        for pair in self
            .entries
            .iter()
            .merge_join_by(other.entries.iter(), |a, b| a.path.cmp(&b.path))
        {
            match pair {
                EitherOrBoth::Left(_) => diff.removed += 1,
                EitherOrBoth::Right(_) => diff.added += 1,
                EitherOrBoth::Both(a, b) if a.hash != b.hash => diff.modified += 1,
                EitherOrBoth::Both(..) => {}
            }
        }
        diff
    }
}
