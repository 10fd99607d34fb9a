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

//! Kinds of entry found in a live tree or inside an archive.

use std::fs::FileType;

use serde::{Deserialize, Serialize};
use tar::EntryType;

/// Kind of tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    File,
    Dir,
    Symlink,
    /// Sockets, devices, fifos and so on: not archived.
    Unknown,
}

impl Kind {
    /// True for the kinds that are content-hashed in a manifest.
    pub fn has_content(&self) -> bool {
        matches!(self, Kind::File | Kind::Symlink)
    }
}

impl From<FileType> for Kind {
    fn from(ft: FileType) -> Kind {
        if ft.is_file() {
            Kind::File
        } else if ft.is_dir() {
            Kind::Dir
        } else if ft.is_symlink() {
            Kind::Symlink
        } else {
            Kind::Unknown
        }
    }
}

impl From<EntryType> for Kind {
    fn from(et: EntryType) -> Kind {
        match et {
            EntryType::Regular | EntryType::Continuous => Kind::File,
            EntryType::Directory => Kind::Dir,
            EntryType::Symlink => Kind::Symlink,
            _ => Kind::Unknown,
        }
    }
}
