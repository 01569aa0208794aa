use std::path::PathBuf;

use crate::db::Db;
use crate::error::TrackerError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7534;

/// Environment variable the client reads for the server's base URL.
pub const SERVER_URL_ENV: &str = "TRK_SERVER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Database lives under `<dir>/.tracker/tracker.sqlite`.
    File(PathBuf),
    /// Ephemeral database, gone when the server exits.
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage: Storage,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage: Storage::File(PathBuf::from(".")),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn open_db(&self) -> Result<Db, TrackerError> {
        match &self.storage {
            Storage::File(dir) => Db::open(dir),
            Storage::Memory => Db::open_in_memory(),
        }
    }
}

pub fn default_server_url() -> String {
    std::env::var(SERVER_URL_ENV).unwrap_or_else(|_| format!("http://localhost:{DEFAULT_PORT}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bind_addr_joins_host_and_port() {
        let config = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9000,
            storage: Storage::Memory,
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn open_db_honours_storage() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            storage: Storage::File(dir.path().to_path_buf()),
            ..Default::default()
        };
        let db = config.open_db().unwrap();
        assert!(db.path.is_some());
        assert!(dir.path().join(".tracker/tracker.sqlite").exists());

        let memory = ServerConfig {
            storage: Storage::Memory,
            ..Default::default()
        };
        assert!(memory.open_db().unwrap().path.is_none());
    }
}
