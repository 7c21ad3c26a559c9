use std::{net::SocketAddr, path::PathBuf};

use anyhow::{anyhow, Context, Result};

const DEFAULT_DB_PATH: &str = "pomodoro.sqlite3";
const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_SYNC_THRESHOLD_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    /// Reject request bodies carrying fields the endpoint does not know.
    pub strict_fields: bool,
    pub sync_threshold_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080))),
            strict_fields: false,
            sync_threshold_secs: DEFAULT_SYNC_THRESHOLD_SECS,
        }
    }
}

impl Config {
    /// Reads `POMODORO_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup("POMODORO_DB_PATH")) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(bind) = non_empty(lookup("POMODORO_BIND")) {
            config.bind = bind
                .parse()
                .with_context(|| format!("POMODORO_BIND '{bind}' is not a socket address"))?;
        }

        if let Some(strict) = non_empty(lookup("POMODORO_STRICT_FIELDS")) {
            config.strict_fields = parse_flag(&strict)
                .ok_or_else(|| anyhow!("POMODORO_STRICT_FIELDS '{strict}' is not a boolean"))?;
        }

        if let Some(threshold) = non_empty(lookup("POMODORO_SYNC_THRESHOLD_SECS")) {
            let secs: i64 = threshold.parse().with_context(|| {
                format!("POMODORO_SYNC_THRESHOLD_SECS '{threshold}' is not an integer")
            })?;
            if secs < 0 {
                return Err(anyhow!("POMODORO_SYNC_THRESHOLD_SECS must not be negative"));
            }
            config.sync_threshold_secs = secs;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("pomodoro.sqlite3"));
        assert_eq!(config.bind.port(), 8080);
        assert!(!config.strict_fields);
        assert_eq!(config.sync_threshold_secs, 30);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("POMODORO_DB_PATH", "/tmp/focus.db"),
            ("POMODORO_BIND", "0.0.0.0:9000"),
            ("POMODORO_STRICT_FIELDS", "TRUE"),
            ("POMODORO_SYNC_THRESHOLD_SECS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/focus.db"));
        assert_eq!(config.bind.port(), 9000);
        assert!(config.strict_fields);
        assert_eq!(config.sync_threshold_secs, 45);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Config::from_lookup(lookup_from(&[("POMODORO_BIND", "nowhere")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("POMODORO_STRICT_FIELDS", "maybe")])).is_err());
        assert!(
            Config::from_lookup(lookup_from(&[("POMODORO_SYNC_THRESHOLD_SECS", "-1")])).is_err()
        );
    }
}
