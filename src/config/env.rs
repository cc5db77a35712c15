//! Environment variable helpers.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use super::ConfigError;

/// Trimmed value of `name`, `None` when unset or blank.
pub(crate) fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First of `names` that is set.
pub(crate) fn first_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| var(name))
}

pub(crate) fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    var(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

pub(crate) fn bool_var(name: &str) -> Result<Option<bool>, ConfigError> {
    var(name)
        .map(|raw| parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{raw}' is not a boolean"),
        }))
        .transpose()
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Comma-separated list, blanks dropped.
pub(crate) fn list_var(name: &str) -> Vec<String> {
    var(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
