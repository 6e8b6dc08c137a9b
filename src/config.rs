//! Settings file handling.
//!
//! Settings live in `config.toml` inside the data directory. Every key is
//! optional; a missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::employee::DEFAULT_FIELD_DEPARTMENTS;
use crate::error::{Error, Result};
use crate::workflow::DEFAULT_GEOFENCE_KM;

pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "fieldops.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum distance from site, in km, for a field technician to submit.
    pub geofence_radius_km: f64,
    /// Departments whose members are treated as field staff.
    pub field_departments: Vec<String>,
    /// Database file; defaults to `fieldops.json` in the data directory.
    pub database: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            geofence_radius_km: DEFAULT_GEOFENCE_KM,
            field_departments: DEFAULT_FIELD_DEPARTMENTS.iter().map(|d| d.to_string()).collect(),
            database: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Database path, resolving a relative configured path against `data_dir`.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        match &self.database {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => data_dir.join(p),
            None => data_dir.join(DB_FILE),
        }
    }
}

/// `$HOME/.fieldops`, or `./.fieldops` when `HOME` is unset.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".fieldops")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.geofence_radius_km, 2.0);
        assert_eq!(s.database_path(dir.path()), dir.path().join(DB_FILE));
    }

    #[test]
    fn partial_file_overrides_some_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "geofence_radius_km = 0.5\ndatabase = \"jobs.json\"\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.geofence_radius_km, 0.5);
        assert_eq!(s.field_departments, vec!["Service", "Sales"]);
        assert_eq!(s.database_path(dir.path()), dir.path().join("jobs.json"));
    }

    #[test]
    fn bad_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "geofence_radius_km = \"far\"").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Config { .. })));
    }
}
