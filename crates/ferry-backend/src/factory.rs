//! Backend construction from a connection config.

use std::sync::Arc;

use ferry_common::config::{BackendKind, ConnectionConfig};
use ferry_common::error::{FerryError, FerryResult};

use crate::memory::MemoryBackend;
use crate::traits::Backend;

/// Resolves a connection config into a shared backend handle.
///
/// Resolution happens once; the handle is then passed to every worker.
///
/// # Errors
///
/// Returns [`FerryError::UnsupportedBackend`] for kinds compiled out of this
/// build, and configuration errors from [`ConnectionConfig::validate`].
pub fn connect(config: &ConnectionConfig) -> FerryResult<Arc<dyn Backend>> {
    config.validate()?;
    tracing::info!("Connecting to {}", config.connection_url());

    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => Arc::new(crate::sqlite_backend::SqliteBackend::from_config(config)?),
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => Arc::new(crate::postgres_backend::PostgresBackend::from_config(config)?),
        #[cfg(feature = "mysql")]
        BackendKind::MySql => Arc::new(crate::mysql_backend::MySqlBackend::from_config(config)?),
        #[allow(unreachable_patterns)]
        kind => return Err(compiled_out(kind)),
    };
    Ok(backend)
}

fn compiled_out(kind: BackendKind) -> FerryError {
    FerryError::UnsupportedBackend {
        kind: format!("{} (not compiled into this build)", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_memory() {
        let backend = connect(&ConnectionConfig::memory()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Memory);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_connect_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = connect(&ConnectionConfig::sqlite(dir.path().join("a.db"))).unwrap();
        assert_eq!(backend.kind(), BackendKind::Sqlite);
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn test_compiled_out_kind_is_unsupported() {
        let config = ConnectionConfig::new(BackendKind::Postgres, "db");
        assert!(matches!(
            connect(&config),
            Err(FerryError::UnsupportedBackend { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ConnectionConfig::new(BackendKind::Memory, " ");
        assert!(matches!(connect(&config), Err(FerryError::Config { .. })));
    }
}
