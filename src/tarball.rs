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

//! Write and extract the compressed tar archives that hold each component.
//!
//! Each archive is accompanied by a checksum file over the archive bytes,
//! so that damage in storage or transport can be detected later, without
//! decompressing.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use derive_more::{Add, AddAssign};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::hash::{write_checksum_file, HashingWriter};
use crate::io::{AtomicFile, WriteMode};
use crate::live_tree::walk_tree;
use crate::*;

/// Highest gzip compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Sizes and counts from writing or extracting an archive.
#[derive(Add, AddAssign, Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ArchiveStats {
    /// Files, directories and symlinks stored or extracted.
    pub entries: u64,
    /// Total bytes in regular files.
    pub file_bytes: u64,
    /// Length of the compressed archive.
    pub archive_bytes: u64,
}

/// A written archive and its checksum.
#[derive(Debug, Clone)]
pub struct WrittenArchive {
    pub path: PathBuf,
    pub checksum: Sha256Hash,
    pub stats: ArchiveStats,
}

/// Package the tree under `source` into a new gzipped tar at `archive_path`,
/// and write its checksum file.
///
/// The archive is built under a temporary name and only appears at
/// `archive_path` once complete. The source is only read: nothing freezes
/// it, so concurrent changes may be captured partially.
#[instrument(skip(exclude))]
pub fn write_archive(
    source: &Path,
    archive_path: &Path,
    exclude: &Exclude,
    compression_level: u32,
) -> Result<WrittenArchive> {
    fail::fail_point!("tarball::write-archive", |_| Err(Error::WriteArchive {
        path: archive_path.to_owned(),
        source: io::Error::other("injected failure"),
    }));
    let entries = walk_tree(source, exclude)?;
    let write_err = |source: io::Error| Error::WriteArchive {
        path: archive_path.to_owned(),
        source,
    };
    let mut stats = ArchiveStats::default();
    let mut af = AtomicFile::new(archive_path).map_err(write_err)?;
    let checksum = {
        let hashing = HashingWriter::new(BufWriter::new(&mut *af));
        let gz = GzEncoder::new(hashing, Compression::new(compression_level));
        let mut builder = tar::Builder::new(gz);
        builder.follow_symlinks(false);
        for entry in &entries {
            builder
                .append_path_with_name(&entry.path, &entry.relative)
                .map_err(write_err)?;
            stats.entries += 1;
            if entry.kind == Kind::File {
                stats.file_bytes += std::fs::symlink_metadata(&entry.path)
                    .map(|m| m.len())
                    .unwrap_or_default();
            }
        }
        let gz = builder.into_inner().map_err(write_err)?;
        let hashing = gz.finish().map_err(write_err)?;
        let (mut buf, checksum, len) = hashing.finish();
        buf.flush().map_err(write_err)?;
        stats.archive_bytes = len;
        checksum
    };
    af.close(WriteMode::CreateNew).map_err(write_err)?;
    write_checksum_file(archive_path, &checksum)?;
    debug!(%checksum, ?stats, "Wrote archive");
    Ok(WrittenArchive {
        path: archive_path.to_owned(),
        checksum,
        stats,
    })
}

/// Open a gzipped tar archive for reading.
pub(crate) fn open_archive(
    archive_path: &Path,
) -> Result<tar::Archive<GzDecoder<BufReader<File>>>> {
    let f = File::open(archive_path).map_err(|source| Error::ReadArchive {
        path: archive_path.to_owned(),
        source,
    })?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(f))))
}

/// Extract an archive into an existing directory.
///
/// Permissions and modification times are restored. Entries whose paths
/// would land outside `destination` are skipped with a warning.
///
/// Directories are unpacked after everything else, deepest first, so that
/// writing their children doesn't disturb their mtimes and a read-only
/// directory doesn't block its own contents.
#[instrument]
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<ArchiveStats> {
    let extract_err = |source: io::Error| Error::Extract {
        archive: archive_path.to_owned(),
        destination: destination.to_owned(),
        source,
    };
    let mut archive = open_archive(archive_path)?;
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    let mut stats = ArchiveStats {
        archive_bytes: std::fs::metadata(archive_path)
            .map(|m| m.len())
            .unwrap_or_default(),
        ..Default::default()
    };
    let mut directories = Vec::new();
    for entry in archive.entries().map_err(extract_err)? {
        let entry = entry.map_err(extract_err)?;
        if entry.header().entry_type() == tar::EntryType::Directory {
            directories.push(entry);
        } else {
            unpack_entry(entry, destination, &mut stats).map_err(extract_err)?;
        }
    }
    directories.sort_by(|a, b| b.path_bytes().cmp(&a.path_bytes()));
    for entry in directories {
        unpack_entry(entry, destination, &mut stats).map_err(extract_err)?;
    }
    Ok(stats)
}

fn unpack_entry<R: io::Read>(
    mut entry: tar::Entry<'_, R>,
    destination: &Path,
    stats: &mut ArchiveStats,
) -> io::Result<()> {
    let is_file = Kind::from(entry.header().entry_type()) == Kind::File;
    let size = entry.size();
    if entry.unpack_in(destination)? {
        stats.entries += 1;
        if is_file {
            stats.file_bytes += size;
        }
    } else {
        let name = entry.path().map(|p| p.into_owned()).unwrap_or_default();
        warn!(?name, "Skipped archive entry outside the destination");
    }
    Ok(())
}
