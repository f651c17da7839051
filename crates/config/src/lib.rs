//! Typed settings for the parlor process.
//!
//! Settings are an explicit value constructed once at startup and passed
//! into component constructors; no crate reads configuration implicitly.
//! The file format is TOML; component argument tables are passed through to
//! the resolver as raw JSON values, so each backend defines its own schema.

use std::path::Path;

use serde::{Deserialize, Serialize};

use parlor_common::{Error, Result};

/// Names one implementation of a capability plus its argument table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSelector {
    pub name: String,
    /// Backend-specific argument table, passed through to the resolver.
    #[serde(default = "empty_args")]
    pub args: serde_json::Value,
}

fn empty_args() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ComponentSelector {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: empty_args(),
        }
    }
}

/// Process-wide settings: worker count and the broker/policy/channel
/// selections resolved once before the pool starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of concurrent worker tasks.
    pub workers: usize,
    pub broker: ComponentSelector,
    pub policy: ComponentSelector,
    pub channel: ComponentSelector,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: 1,
            broker: ComponentSelector::named("memory"),
            policy: ComponentSelector::named("echo"),
            channel: ComponentSelector::named("console"),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|error| Error::config(format!("{}: {error}", path.display())))?;
        Self::parse(&raw)
    }

    /// Parse settings from TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(Error::config)
    }
}
