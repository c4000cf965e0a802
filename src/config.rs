//! Runtime configuration, read from the environment.
//!
//! A `.env` file in the working directory is loaded first, so every
//! variable can also be set there.

use log::LevelFilter;
use std::env;
use std::path::PathBuf;

const DEFAULT_DB: &str = "carewell.db";
const DEFAULT_LOG: &str = "carewell.log";
const DEFAULT_ADMIN_EMAIL: &str = "admin@carewell.local";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `CAREWELL_DB`
    pub db_path: PathBuf,
    /// `CAREWELL_LOG`
    pub log_path: PathBuf,
    /// `CAREWELL_LOG_LEVEL`
    pub log_level: LevelFilter,
    /// `CAREWELL_ADMIN_EMAIL`
    pub admin_email: String,
    /// `CAREWELL_ADMIN_PASSWORD`
    pub admin_password: String,
    /// Set when `CAREWELL_LOG_LEVEL` held something unparseable.
    pub rejected_log_level: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let level_text = get("CAREWELL_LOG_LEVEL", "info");
        let (log_level, rejected_log_level) = match level_text.parse::<LevelFilter>() {
            Ok(level) => (level, None),
            Err(_) => (LevelFilter::Info, Some(level_text)),
        };

        Self {
            db_path: PathBuf::from(get("CAREWELL_DB", DEFAULT_DB)),
            log_path: PathBuf::from(get("CAREWELL_LOG", DEFAULT_LOG)),
            log_level,
            admin_email: get("CAREWELL_ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            admin_password: get("CAREWELL_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            rejected_log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]);
        assert_eq!(c.db_path, PathBuf::from("carewell.db"));
        assert_eq!(c.log_path, PathBuf::from("carewell.log"));
        assert_eq!(c.log_level, LevelFilter::Info);
        assert_eq!(c.admin_email, "admin@carewell.local");
        assert_eq!(c.rejected_log_level, None);
    }

    #[test]
    fn overrides() {
        let c = config(&[
            ("CAREWELL_DB", "/tmp/ward.db"),
            ("CAREWELL_LOG_LEVEL", "debug"),
            ("CAREWELL_ADMIN_PASSWORD", "s3cret!"),
        ]);
        assert_eq!(c.db_path, PathBuf::from("/tmp/ward.db"));
        assert_eq!(c.log_level, LevelFilter::Debug);
        assert_eq!(c.admin_password, "s3cret!");
    }

    #[test]
    fn bad_level_falls_back_to_info() {
        let c = config(&[("CAREWELL_LOG_LEVEL", "loud")]);
        assert_eq!(c.log_level, LevelFilter::Info);
        assert_eq!(c.rejected_log_level.as_deref(), Some("loud"));
    }
}
