use crate::error::Error;
use crate::registry::DEFAULT_KEY_ATTEMPTS;
use std::env;
use std::str::FromStr;

pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Settings read from the environment (after `.env`, when present)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub pool_size: u32,
    /// Mint attempts before giving up on a unique share key
    pub key_attempts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            pool_size: DEFAULT_POOL_SIZE,
            key_attempts: DEFAULT_KEY_ATTEMPTS,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T, Error> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("{} is not a valid number: {}", name, raw))),
    }
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        dotenv::dotenv().ok();
        Config::from_vars(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pool_size = parse_var(
            "MJSCORE_POOL_SIZE",
            lookup("MJSCORE_POOL_SIZE"),
            DEFAULT_POOL_SIZE,
        )?;
        let key_attempts = parse_var(
            "MJSCORE_KEY_ATTEMPTS",
            lookup("MJSCORE_KEY_ATTEMPTS"),
            DEFAULT_KEY_ATTEMPTS,
        )?;
        if pool_size == 0 {
            return Err(Error::InvalidConfig(
                "MJSCORE_POOL_SIZE must be at least 1".to_string(),
            ));
        }
        if key_attempts == 0 {
            return Err(Error::InvalidConfig(
                "MJSCORE_KEY_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(Config {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            pool_size,
            key_attempts,
        })
    }

    /// The database url, which postgres backed commands cannot do without
    pub fn require_database_url(&self) -> Result<&str, Error> {
        self.database_url.as_deref().ok_or_else(|| {
            Error::InvalidConfig("DATABASE_URL must be set to the postgres database url".into())
        })
    }
}
