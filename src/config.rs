use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::store::StoreOptions;

pub const DEFAULT_CONFIG_FILE: &str = "Teller.toml";
pub const ENV_PREFIX: &str = "TELLER_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub log_path: PathBuf,
    pub loglevel: String,
    pub store_timeout_secs: u64,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://teller.db?mode=rwc".to_owned(),
            log_path: PathBuf::from("transaction_log.txt"),
            loglevel: "info".to_owned(),
            store_timeout_secs: 5,
            max_connections: 4,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file, then `TELLER_*` environment variables.
    pub fn figment(file: Option<&Path>) -> Figment {
        let file = file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            timeout: Duration::from_secs(self.store_timeout_secs.max(1)),
            max_connections: self.max_connections.max(1),
        }
    }
}
