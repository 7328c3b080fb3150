//! Runtime configuration
//!
//! Native builds read the process environment (after `.env` is loaded); web
//! builds get the same keys baked in at compile time.

use std::time::Duration;

use thiserror::Error;

use crate::state::cache::CacheConfig;
use crate::state::notifications::DEFAULT_TOAST_DURATION;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is not a valid number: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub cache: CacheConfig,
    pub toast_duration: Duration,
}

impl AppConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let number = |key: &'static str, default: u64| match lookup(key) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid { key, value }),
            None => Ok(default),
        };

        let defaults = CacheConfig::default();
        Ok(Self {
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            cache: CacheConfig {
                capacity: number("LEADS_CACHE_CAPACITY", defaults.capacity as u64)? as usize,
                stale_time: Duration::from_millis(number(
                    "LEADS_STALE_TIME_MS",
                    defaults.stale_time.as_millis() as u64,
                )?),
            },
            toast_duration: Duration::from_millis(number(
                "LEADS_TOAST_MS",
                DEFAULT_TOAST_DURATION.as_millis() as u64,
            )?),
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| {
            let value = match key {
                "SUPABASE_URL" => option_env!("SUPABASE_URL"),
                "SUPABASE_ANON_KEY" => option_env!("SUPABASE_ANON_KEY"),
                "LEADS_CACHE_CAPACITY" => option_env!("LEADS_CACHE_CAPACITY"),
                "LEADS_STALE_TIME_MS" => option_env!("LEADS_STALE_TIME_MS"),
                "LEADS_TOAST_MS" => option_env!("LEADS_TOAST_MS"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }
}
