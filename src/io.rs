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

//! IO utilities.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::trace;

/// Whether a write may replace an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the file already exists.
    CreateNew,
    /// Replace any existing file.
    Overwrite,
}

/// A file written to a temporary name in the destination directory, and
/// renamed into place only when it's complete.
pub(crate) struct AtomicFile {
    path: PathBuf,
    f: tempfile::NamedTempFile,
}

impl AtomicFile {
    pub fn new(path: &Path) -> io::Result<AtomicFile> {
        let dir = path.parent().ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "path has no parent directory")
        })?;
        Ok(AtomicFile {
            path: path.to_path_buf(),
            f: tempfile::Builder::new().prefix("tmp").tempfile_in(dir)?,
        })
    }

    /// Flush, and move the file to its final name.
    ///
    /// If this fails the temporary file is deleted.
    pub fn close(mut self, mode: WriteMode) -> io::Result<()> {
        self.f.flush()?;
        self.f.as_file().sync_data()?;
        let result = match mode {
            WriteMode::CreateNew => self.f.persist_noclobber(&self.path),
            WriteMode::Overwrite => self.f.persist(&self.path),
        };
        result.map(|_| ()).map_err(|e| e.error)
    }
}

impl Deref for AtomicFile {
    type Target = fs::File;

    fn deref(&self) -> &Self::Target {
        self.f.as_file()
    }
}

impl DerefMut for AtomicFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.f.as_file_mut()
    }
}

/// Write bytes to a file, and close.
///
/// If writing fails, the destination is untouched.
pub(crate) fn write_file_entire(path: &Path, bytes: &[u8], mode: WriteMode) -> io::Result<()> {
    let mut f = AtomicFile::new(path)?;
    f.write_all(bytes)?;
    f.close(mode)
}

pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).or_else(|err| {
        if err.kind() == ErrorKind::AlreadyExists {
            Ok(())
        } else {
            Err(err)
        }
    })
}

/// True if a directory exists and is empty.
pub fn directory_is_empty(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// True if there's something at `path` that a restore would overwrite: a
/// non-empty directory, or any non-directory.
///
/// A symlink at `path` is followed, so a link to an empty directory has no
/// data. A missing path, or a dangling link, has no data.
pub fn path_has_data(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(!directory_is_empty(path)?),
        Ok(_) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Remove everything inside a directory, leaving the directory itself.
///
/// The directory is kept so that mount points and its own ownership and
/// permissions survive.
pub fn clear_directory(path: &Path) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let child = entry.path();
        trace!(?child, "Remove");
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&child)?;
        } else {
            fs::remove_file(&child)?;
        }
    }
    Ok(())
}
