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

//! Tests for the Stowage library API.

use std::fs;
use std::path::Path;

mod backup;
mod config;
mod incremental;
mod lock;
mod restore;
mod retention;

/// Flip one byte in the middle of a file.
fn flip_byte(path: &Path) {
    let mut bytes = fs::read(path).expect("read file to damage");
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x55;
    fs::write(path, bytes).expect("write damaged file");
}
