//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root for everything the runtime keeps on disk
    pub data_dir: PathBuf,
    /// Path to the database file
    pub database_path: PathBuf,
    /// Initial remote debugging state, overridden by the persisted setting
    pub remote_debugging: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("tether.db"),
            data_dir,
            remote_debugging: false,
        }
    }

    /// Keep the database in memory; profile and crash directories still
    /// live under `data_dir`.
    pub fn in_memory(data_dir: PathBuf) -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY_DATABASE),
            data_dir,
            remote_debugging: false,
        }
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("profiles")
    }

    pub fn crash_dir(&self) -> PathBuf {
        self.data_dir.join("crashes")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Tether"))
            .unwrap_or_else(|| PathBuf::from(".tether"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_dirs() {
        let config = Config::new(PathBuf::from("/data"));
        assert_eq!(config.database_path, PathBuf::from("/data/tether.db"));
        assert_eq!(config.profiles_dir(), PathBuf::from("/data/profiles"));
        assert_eq!(config.crash_dir(), PathBuf::from("/data/crashes"));
    }

    #[test]
    fn test_in_memory_database() {
        let config = Config::in_memory(PathBuf::from("/data"));
        assert_eq!(config.database_path, PathBuf::from(IN_MEMORY_DATABASE));
    }

    #[test]
    fn test_default_data_dir_is_tether_scoped() {
        let dir = Config::default_data_dir();
        assert!(dir.ends_with("Tether") || dir == PathBuf::from(".tether"));
        if let Some(base) = dirs::data_local_dir() {
            assert_eq!(dir, base.join("Tether"));
        }
    }
}
