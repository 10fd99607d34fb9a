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

//! Access to the live volumes and configuration tree being backed up and
//! restored.

use std::path::{Path, PathBuf};

use crate::*;

/// Provides the set of defined volumes and where their trees live.
pub trait VolumeTree: Send + Sync {
    /// Names of all defined volumes, in the order they should be processed.
    fn volume_names(&self) -> Vec<String>;

    /// Directory holding the live files of a volume.
    ///
    /// Returns [Error::UnknownVolume] for a volume that's not defined.
    fn volume_path(&self, name: &str) -> Result<PathBuf>;

    /// Files inside the volume that are not backed up.
    fn exclude(&self, name: &str) -> Result<Exclude>;

    /// Directory holding the configuration tree.
    fn config_path(&self) -> &Path;

    /// Live location of a component.
    fn component_path(&self, component: &Component) -> Result<PathBuf> {
        match component {
            Component::Config => Ok(self.config_path().to_owned()),
            Component::Volume(name) => self.volume_path(name),
        }
    }
}

#[derive(Debug, Clone)]
struct LocalVolume {
    name: String,
    path: PathBuf,
    exclude: Exclude,
}

/// Volumes that are directories on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalVolumes {
    config_dir: PathBuf,
    volumes: Vec<LocalVolume>,
}

impl LocalVolumes {
    pub fn from_config(config: &Config) -> Result<LocalVolumes> {
        let volumes = config
            .volumes
            .iter()
            .map(|v| {
                Ok(LocalVolume {
                    name: v.name.clone(),
                    path: config.volume_path(v)?,
                    exclude: Exclude::from_patterns(&v.exclude)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LocalVolumes {
            config_dir: config.config_dir.clone(),
            volumes,
        })
    }

    fn get(&self, name: &str) -> Result<&LocalVolume> {
        self.volumes
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::UnknownVolume {
                name: name.to_owned(),
            })
    }
}

impl VolumeTree for LocalVolumes {
    fn volume_names(&self) -> Vec<String> {
        self.volumes.iter().map(|v| v.name.clone()).collect()
    }

    fn volume_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.get(name)?.path.clone())
    }

    fn exclude(&self, name: &str) -> Result<Exclude> {
        Ok(self.get(name)?.exclude.clone())
    }

    fn config_path(&self) -> &Path {
        &self.config_dir
    }
}
