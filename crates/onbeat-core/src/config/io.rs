//! YAML configuration I/O
//!
//! Loading never fails: a missing or unreadable file yields defaults, and every
//! loaded value is clamped through [`Validate`] before it reaches the engine.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Configuration sections that can clamp themselves into supported ranges
pub trait Validate {
    fn validate(&mut self);
}

/// Load and validate a configuration from a YAML file
///
/// # Arguments
/// * `path` - Path to the YAML configuration file
///
/// # Returns
/// The parsed configuration, or `T::default()` when the file is missing or
/// cannot be parsed (a warning is logged in the latter case)
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default + Validate,
{
    log::info!("load_config: Loading from {:?}", path);

    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<T>(&contents).unwrap_or_else(|e| {
            log::warn!("load_config: Failed to parse {:?}: {}, using defaults", path, e);
            T::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("load_config: No config file, using defaults");
            T::default()
        }
        Err(e) => {
            log::warn!("load_config: Failed to read {:?}: {}, using defaults", path, e);
            T::default()
        }
    };

    config.validate();
    config
}

/// Save a configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Knob {
        level: i32,
        label: String,
    }

    impl Default for Knob {
        fn default() -> Self {
            Self {
                level: 5,
                label: "knob".to_string(),
            }
        }
    }

    impl Validate for Knob {
        fn validate(&mut self) {
            self.level = self.level.clamp(0, 10);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config: Knob = load_config(Path::new("/nonexistent/onbeat/config.yaml"));
        assert_eq!(config, Knob::default());
    }

    #[test]
    fn test_garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "level: [not, a, number").unwrap();

        let config: Knob = load_config(&path);
        assert_eq!(config, Knob::default());
    }

    #[test]
    fn test_loaded_values_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        save_config(
            &Knob {
                level: 99,
                label: "loud".to_string(),
            },
            &path,
        )
        .unwrap();

        let config: Knob = load_config(&path);
        assert_eq!(config.level, 10);
        assert_eq!(config.label, "loud");
    }
}
