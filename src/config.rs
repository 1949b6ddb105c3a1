use std::env::var;
use std::path::PathBuf;

use dotenvy::dotenv;
use thiserror::Error;

use crate::db::Backend;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("An error occurred while parsing {key} env param: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub backend: Backend,
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub data_dir: PathBuf,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads the process environment, after loading `.env` when present.
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let parsed = |key: &'static str| lookup(key).filter(|value| !value.trim().is_empty());
        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            parsed(key)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::Invalid { key, value })
                })
                .transpose()
        };

        let backend = match parsed("STORE").as_deref().map(str::trim) {
            None | Some("sqlite") => Backend::Sqlite,
            Some("json") => Backend::JsonFile,
            Some("memory") => Backend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORE",
                    value: other.to_string(),
                })
            }
        };

        let port = match number("PORT")? {
            None => 8080,
            Some(port) => u16::try_from(port).map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: port.to_string(),
            })?,
        };

        let bcrypt_cost = number("BCRYPT_COST")?.unwrap_or(u64::from(bcrypt::DEFAULT_COST));
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Config {
            host: parsed("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            workers: number("WORKERS")?
                .map(|n| n.max(1) as usize)
                .unwrap_or_else(num_cpus::get),
            backend,
            database_path: parsed("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("microblog.db")),
            max_connections: number("DB_MAX_CONNECTIONS")?
                .map(|n| n.clamp(1, u64::from(u32::MAX)) as u32)
                .unwrap_or(8),
            data_dir: parsed("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            bcrypt_cost: bcrypt_cost as u32,
        })
    }
}
