//! Server configuration.
//!
//! Read from an optional TOML file; command-line flags override individual
//! keys afterwards.
//!
//! ```toml
//! listen = "127.0.0.1:8000"
//! modules_dir = "modules"
//! database = "schemaforge.db"
//! unknown_field_types = "warn"
//! default_page_limit = 100
//! require_auth = false
//!
//! [[tokens]]
//! token = "s3cret"
//! subject = "alice"
//! role = "Admin"
//! ```

use anyhow::{Context, Result};
use schemaforge_engine::DEFAULT_PAGE_LIMIT;
use schemaforge_model::UnknownFieldPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen: SocketAddr,
    /// Root of the `<module>/<submodule>/doctype.json` tree.
    pub modules_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// What the compiler does with unknown field types.
    pub unknown_field_types: UnknownFieldPolicy,
    /// Page size of list requests that do not pass `limit`.
    pub default_page_limit: u64,
    /// Reject requests without a bearer token.
    pub require_auth: bool,
    /// Bearer tokens accepted by the static identity resolver.
    pub tokens: Vec<TokenConfig>,
}

/// One accepted bearer token and the identity it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub token: String,
    pub subject: String,
    pub role: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            modules_dir: PathBuf::from("modules"),
            database: PathBuf::from("schemaforge.db"),
            unknown_field_types: UnknownFieldPolicy::default(),
            default_page_limit: DEFAULT_PAGE_LIMIT,
            require_auth: false,
            tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid configuration")?;
        anyhow::ensure!(
            config.default_page_limit > 0,
            "default_page_limit must be greater than zero"
        );
        Ok(config)
    }

    /// Loads the configuration file at `path`, or the defaults when no path
    /// is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("in config file {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}
