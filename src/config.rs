//! Server configuration.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{ForkError, Result};

pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_LOG_FILTER: &str = "catalog_fork=debug,tower_http=debug";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub addr: SocketAddr,
    /// Tracing filter directives
    pub log_filter: String,
    /// Optional JSON seed file loaded at startup
    pub seed_path: Option<PathBuf>,
    /// Usernames granted sysadmin rights
    pub sysadmins: HashSet<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            seed_path: None,
            sysadmins: HashSet::new(),
        }
    }
}

impl ServerConfig {
    /// Read config from `CATALOG_FORK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read config through `lookup`, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr_text = value("CATALOG_FORK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_text.trim().parse::<SocketAddr>().map_err(|e| {
            ForkError::Config(format!("CATALOG_FORK_ADDR {:?} is not a socket address: {}", addr_text, e))
        })?;

        let sysadmins = value("CATALOG_FORK_SYSADMINS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            addr,
            log_filter: value("CATALOG_FORK_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            seed_path: value("CATALOG_FORK_SEED").map(PathBuf::from),
            sysadmins,
        })
    }

    pub fn is_sysadmin(&self, username: &str) -> bool {
        self.sysadmins.contains(username)
    }
}
