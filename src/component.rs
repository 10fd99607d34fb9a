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

//! Components are the separately archived parts of a backup: the
//! configuration tree, and one per data volume.
//!
//! Externally a component is written as `config` or `volume:<name>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::*;

const VOLUME_PREFIX: &str = "volume:";

/// One separately archived and restorable part of a backup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Component {
    /// The deployment's configuration tree.
    Config,
    /// A named data volume.
    Volume(String),
}

impl Component {
    /// Make a volume component, checking the name.
    pub fn volume(name: &str) -> Result<Component> {
        if valid_volume_name(name) {
            Ok(Component::Volume(name.to_owned()))
        } else {
            Err(Error::InvalidComponent {
                name: format!("{VOLUME_PREFIX}{name}"),
            })
        }
    }

    /// The volume name, if this is a volume.
    pub fn volume_name(&self) -> Option<&str> {
        match self {
            Component::Config => None,
            Component::Volume(name) => Some(name),
        }
    }
}

/// True if `name` is acceptable as a volume name.
///
/// Volume names become file names inside the backup, so they are limited to
/// the same characters container engines allow.
pub fn valid_volume_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    name.len() <= 255 && bytes.all(|b| b.is_ascii_alphanumeric() || b"_.-".contains(&b))
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Config => f.pad("config"),
            Component::Volume(name) => f.pad(&format!("{VOLUME_PREFIX}{name}")),
        }
    }
}

impl FromStr for Component {
    type Err = Error;

    fn from_str(s: &str) -> Result<Component> {
        if s == "config" {
            Ok(Component::Config)
        } else if let Some(name) = s.strip_prefix(VOLUME_PREFIX) {
            Component::volume(name)
        } else {
            Err(Error::InvalidComponent { name: s.to_owned() })
        }
    }
}

impl TryFrom<String> for Component {
    type Error = Error;

    fn try_from(s: String) -> Result<Component> {
        s.parse()
    }
}

impl From<Component> for String {
    fn from(c: Component) -> String {
        c.to_string()
    }
}
