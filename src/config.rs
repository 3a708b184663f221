use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_connections: u32,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub upload_url: String,
    pub max_upload_bytes: usize,
    pub cors_origin: String,
    pub session_minutes: i64,
    pub acks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://heartline.db".to_owned(),
            db_connections: 16,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            upload_dir: PathBuf::from("uploads"),
            upload_url: "/uploads".to_owned(),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origin: "http://localhost:5173".to_owned(),
            session_minutes: 60,
            acks: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let defaults = Config::default();

        Ok(Config {
            database_url: dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_connections: parse_var("HEARTLINE_DB_CONNECTIONS", defaults.db_connections)?,
            bind_addr: parse_var("HEARTLINE_BIND", defaults.bind_addr)?,
            upload_dir: dotenv::var("HEARTLINE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            upload_url: dotenv::var("HEARTLINE_UPLOAD_URL").unwrap_or(defaults.upload_url),
            max_upload_bytes: parse_var("HEARTLINE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            cors_origin: dotenv::var("HEARTLINE_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            session_minutes: parse_var("HEARTLINE_SESSION_MINUTES", defaults.session_minutes)?,
            acks: parse_var("HEARTLINE_ACKS", defaults.acks)?,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_falls_back() {
        let n: u32 = parse_var("HEARTLINE_TEST_SURELY_UNSET", 7).unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn defaults_are_dev_friendly() {
        let config = Config::default();
        assert!(!config.acks);
        assert_eq!(config.upload_url, "/uploads");
        assert_eq!(config.bind_addr.port(), 8080);
    }
}
