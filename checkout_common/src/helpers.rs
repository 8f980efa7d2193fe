use std::{env, fmt::Display, str::FromStr};

use log::*;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads `name` from the environment, logging a warning and returning `default` if it is not set.
pub fn env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{name} is not set. Using the default, {default}");
        default.to_string()
    })
}

/// Reads `name` from the environment and parses it, falling back to `default` if it is missing or malformed.
pub fn parse_env_or_default<T: FromStr + Display>(name: &str, default: T) -> T {
    match env::var(name).ok().map(|s| s.parse::<T>()) {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            error!("{name} is not a valid value. Using the default, {default}");
            default
        },
        None => {
            info!("{name} is not set. Using the default, {default}");
            default
        },
    }
}
