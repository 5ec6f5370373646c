//! Connection settings, read from the environment with hardcoded fallbacks.

use sqlx::mysql::MySqlConnectOptions;

/// MariaDB listens on the stock port; only host and credentials vary per deployment.
pub const DB_PORT: u16 = 3306;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            host: var("MARIADB_HOST", "localhost"),
            user: var("MARIADB_USER", "root"),
            password: var("MARIADB_PASSWORD", ""),
            database: var("MARIADB_DATABASE", "futbol_db"),
        }
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(DB_PORT)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "");
        assert_eq!(config.database, "futbol_db");
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            ("MARIADB_HOST", "db.internal"),
            ("MARIADB_PASSWORD", "s3cret"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.password, "s3cret");
        // Unset keys still fall back
        assert_eq!(config.user, "root");
        assert_eq!(config.database, "futbol_db");
    }
}
