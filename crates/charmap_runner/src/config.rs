// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner configuration.
//!
//! Host values bound into the root environment, record classes, bodies,
//! the expected return type and watch settings. Stored as RON.

use crate::error::RunnerError;
use charmap_diagram::Any;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Config file looked up next to a diagram when none is given
pub const CONFIG_FILE_NAME: &str = "charmap.ron";

/// A plain value bound into the root environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingValue {
    /// Number
    Float(f32),
    /// Text
    String(String),
    /// Vector of values
    Vector(Vec<BindingValue>),
}

impl BindingValue {
    /// Convert to a runtime value
    pub fn to_any(&self) -> Any {
        match self {
            BindingValue::Float(value) => Any::Float(*value),
            BindingValue::String(text) => Any::String(text.clone()),
            BindingValue::Vector(items) => Any::Vector(items.iter().map(Self::to_any).collect()),
        }
    }
}

/// A record class constructible from diagram code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Class name, also the binding name
    pub name: String,
    /// Parameters in order; `None` marks a required parameter
    #[serde(default)]
    pub parameters: IndexMap<String, Option<BindingValue>>,
}

/// A host body exposing position and rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Position in world units
    pub position: [f32; 2],
    /// Rotation in degrees
    #[serde(default)]
    pub rotation: f32,
}

/// File watching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for file events
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 250 }
    }
}

/// Complete runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Format version
    pub version: u32,
    /// Type a `return` must produce, if any
    pub expected_return_type: Option<String>,
    /// Plain values by name
    pub bindings: IndexMap<String, BindingValue>,
    /// Record classes
    pub classes: Vec<ClassConfig>,
    /// Bodies by name
    pub bodies: IndexMap<String, BodyConfig>,
    /// Watch settings
    pub watch: WatchConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            expected_return_type: None,
            bindings: IndexMap::new(),
            classes: Vec::new(),
            bodies: IndexMap::new(),
            watch: WatchConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Parse a config from RON text
    pub fn from_ron(content: &str) -> Result<Self, RunnerError> {
        let config: RunnerConfig = ron::from_str(content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(RunnerError::UnsupportedConfigVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunnerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content)
    }

    /// Load `explicit` if given, else `charmap.ron` next to the diagram, else defaults
    pub fn resolve(explicit: Option<&Path>, diagram: &Path) -> Result<Self, RunnerError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let sibling = diagram
            .parent()
            .map_or_else(|| CONFIG_FILE_NAME.into(), |dir| dir.join(CONFIG_FILE_NAME));
        if sibling.is_file() {
            tracing::info!("Using config {}", sibling.display());
            Self::load(&sibling)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, RunnerError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), RunnerError> {
        let content = self.to_ron()?;
        std::fs::write(path, content).map_err(|source| RunnerError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunnerConfig {
        let mut config = RunnerConfig {
            expected_return_type: Some("vector".into()),
            ..RunnerConfig::default()
        };
        config.bindings.insert("speed".into(), BindingValue::Float(2.5));
        config.bindings.insert(
            "origin".into(),
            BindingValue::Vector(vec![BindingValue::Float(0.0), BindingValue::Float(1.0)]),
        );
        config.classes.push(ClassConfig {
            name: "Offset".into(),
            parameters: IndexMap::from([
                ("dx".to_string(), None),
                ("dy".to_string(), Some(BindingValue::Float(0.0))),
            ]),
        });
        config.bodies.insert(
            "player".into(),
            BodyConfig {
                position: [3.0, 4.0],
                rotation: 90.0,
            },
        );
        config
    }

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn test_serialization() {
        let config = sample();
        let loaded = RunnerConfig::from_ron(&config.to_ron().unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = RunnerConfig::from_ron("(bindings: {\"scale\": Float(2.0)})").unwrap();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.bindings["scale"], BindingValue::Float(2.0));
        assert_eq!(config.watch, WatchConfig::default());
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = RunnerConfig::from_ron("(version: 99)");
        assert!(matches!(
            result,
            Err(RunnerError::UnsupportedConfigVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("charmap-config-{}.ron", std::process::id()));
        let config = sample();
        config.save(&path).unwrap();
        let loaded = RunnerConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_binding_conversion() {
        let value = BindingValue::Vector(vec![
            BindingValue::Float(1.0),
            BindingValue::String("a".into()),
        ]);
        assert_eq!(
            value.to_any(),
            Any::Vector(vec![Any::Float(1.0), Any::String("a".into())])
        );
    }
}
