use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Runtime settings of the binary
///
/// Read from `storefront.toml` (optional) and then `STOREFRONT_*`
/// environment variables, the latter win.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where the order store lives when built with `redis_db`
    pub redis_url: String,

    /// Prepended to every store key
    pub key_prefix: String,

    /// Used when `RUST_LOG` isn't set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            redis_url:  "redis://127.0.0.1/".to_string(),
            key_prefix: "storefront".to_string(),
            log_level:  "info".to_string(),
        }
    }
}

impl Settings {
    pub const DEFAULT_FILE: &'static str = "storefront.toml";

    pub fn load(path: Option<&str>) -> Result<Settings, Error> {
        let path = path.unwrap_or(Self::DEFAULT_FILE);
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("STOREFRONT"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
