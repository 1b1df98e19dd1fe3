//! Connection resolution for the CLI.
//!
//! A connection comes from a TOML file, from flags, or from a file with flags
//! layered on top.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use ferry_common::config::{BackendKind, ConnectionConfig};

/// Connection flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Connection file (TOML)
    #[arg(short = 'c', long, value_name = "FILE", env = "FERRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend kind: postgresql, mysql, sqlite
    #[arg(short = 'b', long, env = "FERRY_BACKEND")]
    pub backend: Option<String>,

    /// Database name, or file path for SQLite
    #[arg(short = 'd', long, env = "FERRY_DATABASE")]
    pub database: Option<String>,

    /// Server hostname
    #[arg(short = 'H', long, env = "FERRY_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short = 'p', long, env = "FERRY_PORT")]
    pub port: Option<u16>,

    /// Username
    #[arg(short = 'U', long, env = "FERRY_USER")]
    pub user: Option<String>,

    /// Password (use FERRY_PASSWORD env var for security)
    #[arg(short = 'W', long, env = "FERRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl ConnectionArgs {
    /// Resolves the flags into a validated connection config.
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let base = match &self.config {
            Some(path) => Some(load_file(path)?),
            None => None,
        };

        let mut config = match (base, &self.backend) {
            (Some(mut config), backend) => {
                if let Some(kind) = backend {
                    config.backend = kind.parse::<BackendKind>()?;
                }
                config
            }
            (None, Some(kind)) => {
                let Some(database) = &self.database else {
                    bail!("--database is required when no connection file is given");
                };
                ConnectionConfig::new(kind.parse()?, database.clone())
            }
            (None, None) => bail!("either --config or --backend must be given"),
        };

        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Loads a connection file with the path in the error context.
pub fn load_file(path: &Path) -> Result<ConnectionConfig> {
    ConnectionConfig::from_file(path)
        .with_context(|| format!("cannot load connection file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_only() {
        let args = ConnectionArgs {
            backend: Some("sqlite".to_string()),
            database: Some("/tmp/a.db".to_string()),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.database, "/tmp/a.db");
    }

    #[test]
    fn test_missing_connection() {
        assert!(ConnectionArgs::default().resolve().is_err());

        let args = ConnectionArgs {
            backend: Some("sqlite".to_string()),
            ..Default::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("--database"));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conn.toml");
        std::fs::write(
            &path,
            "backend = \"postgresql\"\ndatabase = \"warehouse\"\nuser = \"etl\"\n",
        )
        .unwrap();

        let args = ConnectionArgs {
            config: Some(path),
            host: Some("db.internal".to_string()),
            port: Some(6543),
            password: Some("pw".to_string()),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.database, "warehouse");
        assert_eq!(config.user.as_deref(), Some("etl"));
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, Some(6543));
        assert_eq!(config.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_unknown_backend_flag() {
        let args = ConnectionArgs {
            backend: Some("oracle".to_string()),
            database: Some("x".to_string()),
            ..Default::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("unsupported database backend"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let args = ConnectionArgs {
            config: Some(PathBuf::from("/nonexistent/conn.toml")),
            ..Default::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/conn.toml"));
    }
}
