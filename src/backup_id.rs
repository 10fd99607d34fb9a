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

//! Backups are identified by a string like `20261016-093015-4f2a9c`,
//! represented by a `BackupId`.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::*;

const MAX_LEN: usize = 128;

/// Identifier for a backup, which is also its directory name under the
/// backup root.
///
/// Generated ids start with a UTC timestamp so that they sort in creation
/// order, followed by a random suffix to keep two backups taken in the same
/// second apart. Callers may also choose their own ids, as long as they are
/// safe as a single path component.
#[derive(Debug, PartialEq, Clone, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupId(String);

impl BackupId {
    /// Make a new id from the given time and a random suffix.
    pub fn generate<R: Rng + ?Sized>(now: OffsetDateTime, rng: &mut R) -> BackupId {
        let format = format_description!("[year][month][day]-[hour][minute][second]");
        let stamp = now
            .to_offset(time::UtcOffset::UTC)
            .format(&format)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        let suffix: u32 = rng.gen_range(0..0x100_0000);
        BackupId(format!("{stamp}-{suffix:06x}"))
    }

    /// Make a BackupId from a string, checking that it's safe to use as a
    /// directory name.
    pub fn new(s: &str) -> Result<BackupId> {
        let ok = !s.is_empty()
            && s.len() <= MAX_LEN
            && !s.starts_with('.')
            && !s.starts_with('-')
            && s.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-');
        if ok {
            Ok(BackupId(s.to_owned()))
        } else {
            Err(Error::InvalidBackupId { id: s.to_owned() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BackupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<BackupId> {
        BackupId::new(s)
    }
}

impl TryFrom<String> for BackupId {
    type Error = Error;

    fn try_from(s: String) -> Result<BackupId> {
        BackupId::new(&s)
    }
}

impl From<BackupId> for String {
    fn from(id: BackupId) -> String {
        id.0
    }
}
