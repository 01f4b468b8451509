use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config.invalid_value: {key}={value}")]
    InvalidValue { key: String, value: String },
}

/// Where configuration values come from. The process environment in
/// production, a map in tests.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Blank values count as unset.
pub fn string_or(env: &dyn EnvSource, key: &str, default: &str) -> String {
    env.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub fn parse_or<T: FromStr>(env: &dyn EnvSource, key: &str, default: T) -> Result<T, ConfigError> {
    let Some(raw) = env.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw,
    })
}

pub fn secs_or(env: &dyn EnvSource, key: &str, default: Duration) -> Result<Duration, ConfigError> {
    parse_or(env, key, default.as_secs()).map(Duration::from_secs)
}

/// Like [`secs_or`] but zero is rejected. For periods and deadlines.
pub fn positive_secs_or(env: &dyn EnvSource, key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let value = secs_or(env, key, default)?;
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
        });
    }
    Ok(value)
}

pub fn millis_or(env: &dyn EnvSource, key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let default = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(env, key, default).map(Duration::from_millis)
}

pub fn flag_or(env: &dyn EnvSource, key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = env.get(key).map(|v| v.trim().to_ascii_lowercase()).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match raw.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
