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

//! Read and write JSON files.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::io::{write_file_entire, WriteMode};
use crate::*;

/// Write `obj` as pretty-printed JSON, replacing the file atomically.
pub(crate) fn write_json<T: Serialize>(path: &Path, obj: &T, mode: WriteMode) -> Result<()> {
    let mut s = serde_json::to_string_pretty(obj).map_err(|source| Error::SerializeJson {
        path: path.to_owned(),
        source,
    })?;
    s.push('\n');
    write_file_entire(path, s.as_bytes(), mode).map_err(|source| Error::WriteMetadata {
        path: path.to_owned(),
        source,
    })
}

/// Read and deserialize a JSON file.
///
/// A missing file is reported as [Error::ReadMetadata]; check
/// [Error::is_not_found].
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|source| Error::ReadMetadata {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| Error::DeserializeJson {
        path: path.to_owned(),
        source,
    })
}
