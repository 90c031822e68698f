use std::{env, time::Duration};

use thiserror::Error;

use crate::booking::FetchFailurePolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("one of ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set")]
    MissingAdminCredential,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreConfig {
    Rest {
        base_url: String,
        api_key: String,
        timeout: Duration,
    },
    Sqlite {
        database_url: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminSecret {
    /// Argon2 PHC string.
    Hash(String),
    Plain(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub store: StoreConfig,
    pub admin_user: String,
    pub admin_secret: AdminSecret,
    pub fetch_failure: FetchFailurePolicy,
    pub port: u16,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backend = get("STORE_BACKEND").unwrap_or_else(|| "rest".to_string());
        let store = match backend.trim() {
            "rest" => {
                let base_url = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                let api_key =
                    get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
                let timeout = match get("STORE_TIMEOUT_SECS") {
                    Some(value) => value
                        .trim()
                        .parse::<u64>()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .map(Duration::from_secs)
                        .ok_or(ConfigError::Invalid {
                            name: "STORE_TIMEOUT_SECS",
                            value,
                        })?,
                    None => Duration::from_secs(10),
                };
                StoreConfig::Rest {
                    base_url: base_url.trim().trim_end_matches('/').to_string(),
                    api_key: api_key.trim().to_string(),
                    timeout,
                }
            }
            "sqlite" => StoreConfig::Sqlite {
                database_url: get("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite://./data/barbershop.db".to_string()),
            },
            _ => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: backend,
                })
            }
        };

        let admin_secret = match (get("ADMIN_PASSWORD_HASH"), get("ADMIN_PASSWORD")) {
            (Some(hash), _) => AdminSecret::Hash(hash.trim().to_string()),
            (None, Some(password)) => AdminSecret::Plain(password),
            (None, None) => return Err(ConfigError::MissingAdminCredential),
        };

        let fetch_failure = match get("AVAILABILITY_ON_FETCH_ERROR") {
            Some(value) => match value.trim() {
                "open" => FetchFailurePolicy::Open,
                "closed" => FetchFailurePolicy::Closed,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "AVAILABILITY_ON_FETCH_ERROR",
                        value,
                    })
                }
            },
            None => FetchFailurePolicy::Open,
        };

        let port = match get("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: value.clone(),
            })?,
            None => 8080,
        };

        Ok(Self {
            store,
            admin_user: get("ADMIN_USER").unwrap_or_else(|| "admin".to_string()),
            admin_secret,
            fetch_failure,
            port,
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "./static".to_string()),
        })
    }
}
