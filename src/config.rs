use std::env;
use std::fmt;

use crate::i18n::Locale;

/// Runtime configuration, read once at startup from the environment
/// (a `.env` file is loaded first when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    pub app_name: String,
    pub locale: Locale,
    pub seed_demo: bool,
    pub admin_password: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{var} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Invalid values fall
    /// back to their defaults with a warning.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or_else(|| {
                log::warn!("Invalid DATABASE_MAX_CONNECTIONS '{v}', using 10");
                10
            }),
            None => 10,
        };

        let session_key = match get("SESSION_KEY") {
            Some(val) if val.len() >= 64 => Some(val),
            Some(val) => {
                log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
                None
            }
            None => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                None
            }
        };

        let locale = match get("APP_LOCALE") {
            Some(v) => Locale::from_code(&v).unwrap_or_else(|| {
                log::warn!("Unknown APP_LOCALE '{v}', using es");
                Locale::Es
            }),
            None => Locale::Es,
        };

        Ok(Self {
            database_url,
            max_connections,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            session_key,
            cookie_secure: parse_flag(get("COOKIE_SECURE")),
            app_name: get("APP_NAME").unwrap_or_else(|| "Aula".to_string()),
            locale,
            seed_demo: parse_flag(get("SEED_DEMO")),
            admin_password: get("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
        })
    }
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("TRUE") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.to_string(), "DATABASE_URL must be set");
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/aula")])).unwrap();
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.app_name, "Aula");
        assert_eq!(cfg.locale, Locale::Es);
        assert!(!cfg.seed_demo);
        assert!(!cfg.cookie_secure);
        assert!(cfg.session_key.is_none());
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/aula"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
            ("APP_LOCALE", "fr"),
            ("SESSION_KEY", "short"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.locale, Locale::Es);
        assert!(cfg.session_key.is_none());
    }

    #[test]
    fn explicit_values_win() {
        let key = "k".repeat(64);
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/aula"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("APP_LOCALE", "en"),
            ("SESSION_KEY", key.as_str()),
            ("SEED_DEMO", "true"),
            ("COOKIE_SECURE", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_connections, 4);
        assert_eq!(cfg.locale, Locale::En);
        assert_eq!(cfg.session_key.as_deref(), Some(key.as_str()));
        assert!(cfg.seed_demo);
        assert!(cfg.cookie_secure);
    }
}
