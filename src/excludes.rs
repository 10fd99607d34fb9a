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

//! Exclusion globs for files inside a volume.
//!
//! Patterns that start with a slash match only against full paths from the
//! top of the volume. Patterns that do not start with a slash match the
//! suffix of the path. An excluded directory excludes everything inside it.

use std::borrow::Cow;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::*;

/// A set of glob patterns matched against volume-relative paths.
#[derive(Clone, Debug)]
pub struct Exclude(GlobSet);

impl Exclude {
    /// Build from a list of patterns.
    pub fn from_patterns<I: IntoIterator<Item = S>, S: AsRef<str>>(patterns: I) -> Result<Exclude> {
        let mut gsb = GlobSetBuilder::new();
        for pat in patterns {
            let pat = pat.as_ref();
            let pat: Cow<str> = if pat.starts_with('/') {
                Cow::Borrowed(pat)
            } else {
                Cow::Owned(format!("**/{pat}"))
            };
            gsb.add(GlobBuilder::new(&pat).literal_separator(true).build()?);
        }
        Ok(Exclude(gsb.build()?))
    }

    /// Exclude nothing.
    pub fn nothing() -> Exclude {
        Exclude(GlobSet::empty())
    }

    /// True if a path relative to the tree root, like `a/b.txt`, is excluded.
    pub fn matches(&self, relative_path: &str) -> bool {
        !self.0.is_empty() && self.0.is_match(format!("/{relative_path}"))
    }
}

impl Default for Exclude {
    fn default() -> Self {
        Exclude::nothing()
    }
}
