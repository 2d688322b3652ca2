//! Application configuration
//!
//! A small serde-backed options object passed to the application constructor
//! and handed to every module's setup body. Keys the core does not know
//! about are preserved in a flattened extras map so independently-developed
//! modules can carry their own settings without a central schema.

use crate::util;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_name() -> String {
    "canopy".to_string()
}

fn default_level() -> String {
    "debug".to_string()
}

/// Logging defaults consumed by whichever subscriber the binary installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level filter directive (e.g. `"debug"`, `"canopy=trace"`)
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root namespace name; every node path is rendered under it
    #[serde(default = "default_name")]
    pub name: String,

    /// Logging defaults
    #[serde(default)]
    pub log: LogConfig,

    /// Module-specific settings, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            log: LogConfig::default(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Configuration with a custom root name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style extra setting.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Read a module-specific setting.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Shallowly overlay extra settings onto this configuration.
    pub fn overlay(&mut self, overlay: &Map<String, Value>) {
        util::merge(&mut self.extra, overlay);
    }
}
