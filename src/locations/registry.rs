use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::{error, info};

use crate::error::RegistryError;
use crate::models::{normalize_locations, Location, LocationInput};

/// In-memory location list backed by a JSON file.
///
/// Every replacement is written to disk before it becomes visible, so the file
/// and the in-memory copy never disagree.
pub struct LocationRegistry {
    path: PathBuf,
    locations: RwLock<Vec<Location>>,
}

impl LocationRegistry {
    /// Load locations from `path`. A missing file starts an empty registry; a
    /// file that cannot be read or parsed is logged and ignored.
    pub fn load_from_disk(path: PathBuf) -> Self {
        let locations = match read_locations(&path) {
            Ok(Some(locations)) => {
                info!("Loaded {} saved locations from {}", locations.len(), path.display());
                locations
            }
            Ok(None) => {
                info!("No saved locations at {}, starting fresh", path.display());
                Vec::new()
            }
            Err(err) => {
                error!("Ignoring unreadable locations file {}: {err:#}", path.display());
                Vec::new()
            }
        };

        Self {
            path,
            locations: RwLock::new(locations),
        }
    }

    pub fn list(&self) -> Vec<Location> {
        self.read().clone()
    }

    /// Validate, persist and swap in a complete new location set.
    pub fn replace_all(&self, inputs: Vec<LocationInput>) -> Result<Vec<Location>, RegistryError> {
        let locations = normalize_locations(inputs)?;

        let mut guard = self.write();
        self.persist(&locations)?;
        *guard = locations.clone();

        info!("Saved {} locations", locations.len());
        Ok(locations)
    }

    fn persist(&self, locations: &[Location]) -> Result<(), RegistryError> {
        let serialized = serde_json::to_string_pretty(locations)?;
        let io_err = |source: std::io::Error| RegistryError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Location>> {
        match self.locations.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Location>> {
        match self.locations.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn read_locations(path: &Path) -> anyhow::Result<Option<Vec<Location>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let inputs: Vec<LocationInput> = serde_json::from_str(&contents)?;
    Ok(Some(normalize_locations(inputs)?))
}
