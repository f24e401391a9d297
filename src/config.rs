// ⚙️ Configuration from environment variables
//
// INVENTORY_BACKEND  json | sqlite | memory     (default json)
// INVENTORY_DATA     path of the data file      (default inventory_db.json)
// INVENTORY_PORT     HTTP port for the server   (default 3000)
//
// CLI flags override whatever is loaded here.

use crate::store::Backend;
use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_BACKEND: &str = "json";
pub const DEFAULT_DATA_PATH: &str = "inventory_db.json";
pub const DEFAULT_PORT: &str = "3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: Backend,
    pub data_path: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production).
    pub fn from_source<F>(source: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            backend: try_load(&source, "INVENTORY_BACKEND", DEFAULT_BACKEND)?,
            data_path: try_load(&source, "INVENTORY_DATA", DEFAULT_DATA_PATH)?,
            port: try_load(&source, "INVENTORY_PORT", DEFAULT_PORT)?,
        };

        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Json,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: 3000,
        }
    }
}

fn try_load<T, F>(source: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = source(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        });

    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value '{raw}'"))
}
