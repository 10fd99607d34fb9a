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

//! Content hashes, used both to detect changed files and to detect damaged
//! archives.
//!
//! Archive checksums are stored beside the archive in `sha256sum` format, so
//! they can also be checked with standard tools.

use std::fmt::{self, Debug, Display};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::io::{write_file_entire, WriteMode};
use crate::*;

const SHA256_BYTES: usize = 32;
const CHECKSUM_EXTENSION: &str = "sha256";

/// A SHA-256 digest.
///
/// Stored in memory as compact bytes, but translatable to and from
/// hex strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String")]
#[serde(try_from = "&str")]
pub struct Sha256Hash {
    bin: [u8; SHA256_BYTES],
}

impl Sha256Hash {
    pub fn of_bytes(bytes: &[u8]) -> Sha256Hash {
        Sha256::digest(bytes).into()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bin
    }
}

impl From<sha2::digest::Output<Sha256>> for Sha256Hash {
    fn from(out: sha2::digest::Output<Sha256>) -> Sha256Hash {
        let mut bin = [0; SHA256_BYTES];
        bin.copy_from_slice(&out);
        Sha256Hash { bin }
    }
}

#[derive(Debug)]
pub struct HashParseError {
    rejected_string: String,
}

impl Display for HashParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse hash string: {:?}", self.rejected_string)
    }
}

impl std::error::Error for HashParseError {}

impl FromStr for Sha256Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut bin = [0; SHA256_BYTES];
        hex::decode_to_slice(s, &mut bin).map_err(|_| HashParseError {
            rejected_string: s.to_owned(),
        })?;
        Ok(Sha256Hash { bin })
    }
}

impl TryFrom<&str> for Sha256Hash {
    type Error = HashParseError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Sha256Hash::from_str(s)
    }
}

impl Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.bin))
    }
}

impl From<Sha256Hash> for String {
    fn from(hash: Sha256Hash) -> String {
        hex::encode(hash.bin)
    }
}

/// Hash everything that can be read from `r`.
pub fn hash_reader(r: &mut dyn Read) -> io::Result<Sha256Hash> {
    let mut hasher = Sha256::new();
    io::copy(r, &mut hasher)?;
    Ok(hasher.finalize().into())
}

/// Hash the content of a file.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    File::open(path)
        .and_then(|mut f| hash_reader(&mut f))
        .map_err(|source| Error::HashFile {
            path: path.to_owned(),
            source,
        })
}

/// Passes bytes through to an inner writer, hashing and counting them on
/// the way.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    len: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> HashingWriter<W> {
        HashingWriter {
            inner,
            hasher: Sha256::new(),
            len: 0,
        }
    }

    /// Return the inner writer, the hash of everything written, and its length.
    pub fn finish(self) -> (W, Sha256Hash, u64) {
        (self.inner, self.hasher.finalize().into(), self.len)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Path of the checksum file that accompanies an archive.
pub fn checksum_path(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_EXTENSION);
    PathBuf::from(name)
}

/// Write the checksum file for an archive, in `sha256sum` format.
pub fn write_checksum_file(archive_path: &Path, hash: &Sha256Hash) -> Result<()> {
    let path = checksum_path(archive_path);
    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let line = format!("{hash}  {file_name}\n");
    write_file_entire(&path, line.as_bytes(), WriteMode::Overwrite)
        .map_err(|source| Error::WriteChecksum { path, source })
}

/// Read the checksum recorded for an archive.
pub fn read_checksum_file(archive_path: &Path) -> Result<Sha256Hash> {
    let path = checksum_path(archive_path);
    let text = std::fs::read_to_string(&path).map_err(|source| Error::ReadChecksum {
        path: path.clone(),
        source,
    })?;
    text.split_whitespace()
        .next()
        .and_then(|hex| hex.parse().ok())
        .ok_or(Error::MalformedChecksum { path })
}
