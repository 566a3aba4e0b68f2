use std::{fmt, net::SocketAddr};

use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_PORT: u16 = 5432;

/// Where the Postgres connection comes from.
#[derive(Clone)]
pub enum DatabaseConfig {
    /// `DATABASE_URL`, used verbatim.
    Url(String),
    /// Discrete `DATABASE_*` variables, connected without TLS.
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        match self {
            Self::Url(url) => url
                .parse::<PgConnectOptions>()
                .context("parse DATABASE_URL"),
            Self::Parts {
                host,
                port,
                user,
                password,
                name,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(name)
                .ssl_mode(PgSslMode::Disable)),
        }
    }
}

// Never print credentials.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(_) => f.write_str("Url(<redacted>)"),
            Self::Parts {
                host, port, user, name, ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"<redacted>")
                .field("name", name)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub max_connections: u32,
    pub host: String,
    pub port: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL") {
            Some(url) => DatabaseConfig::Url(url),
            None => DatabaseConfig::Parts {
                host: lookup("DATABASE_HOST").context("DATABASE_HOST or DATABASE_URL must be set")?,
                port: lookup("DATABASE_PORT")
                    .map(|v| v.parse::<u16>())
                    .transpose()
                    .context("DATABASE_PORT must be a port number")?
                    .unwrap_or(DEFAULT_DB_PORT),
                user: lookup("DATABASE_USER").context("DATABASE_USER must be set")?,
                password: lookup("DATABASE_PASSWORD").unwrap_or_default(),
                name: lookup("DATABASE_NAME").context("DATABASE_NAME must be set")?,
            },
        };
        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        Ok(Self {
            database,
            max_connections,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("APP_PORT").unwrap_or_else(|| "8080".into()),
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn database_url_wins_over_parts() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://u:p@db:5432/users"),
            ("DATABASE_HOST", "ignored"),
        ])
        .expect("config");
        assert!(matches!(config.database, DatabaseConfig::Url(_)));
        config.database.connect_options().expect("valid url");
    }

    #[test]
    fn parts_fill_defaults() {
        let config = config_from(&[
            ("DATABASE_HOST", "db"),
            ("DATABASE_USER", "app"),
            ("DATABASE_NAME", "users"),
        ])
        .expect("config");
        match &config.database {
            DatabaseConfig::Parts { port, password, .. } => {
                assert_eq!(*port, 5432);
                assert!(password.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.listen_addr().expect("addr").port(), 8080);
    }

    #[test]
    fn missing_host_is_an_error() {
        let err = config_from(&[("DATABASE_USER", "app"), ("DATABASE_NAME", "users")])
            .unwrap_err();
        assert!(err.to_string().contains("DATABASE_HOST"));
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = config_from(&[
            ("DATABASE_HOST", "db"),
            ("DATABASE_USER", "app"),
            ("DATABASE_NAME", "users"),
            ("DATABASE_PORT", "not-a-port"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_PORT"));
    }

    #[test]
    fn unparsable_max_connections_falls_back() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ])
        .expect("config");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn debug_output_hides_password() {
        let config = config_from(&[
            ("DATABASE_HOST", "db"),
            ("DATABASE_USER", "app"),
            ("DATABASE_PASSWORD", "hunter2"),
            ("DATABASE_NAME", "users"),
        ])
        .expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));

        let config = config_from(&[("DATABASE_URL", "postgres://u:hunter2@db/users")])
            .expect("config");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn invalid_listen_address_is_an_error() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/users"),
            ("APP_PORT", "eighty"),
        ])
        .expect("config");
        assert!(config.listen_addr().is_err());
    }
}
