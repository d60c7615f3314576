use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub uri: String,
    pub name: String,
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Movie lookups go to `{base_url}/{movie_id}`
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3006,
            enable_cors: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongo,
            uri: "mongodb://localhost:27017".to_string(),
            name: "movie_reviews".to_string(),
            collection: "reviews".to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/movies".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load `config.toml` (or the file named by `REVIEWS_CONFIG`) when present,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("REVIEWS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_toml_str(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(uri) = lookup("MONGO_URI") {
            self.database.uri = uri;
        }
        if let Some(url) = lookup("MOVIE_CATALOG_URL") {
            self.catalog.base_url = url;
        }
        if let Some(timeout) = lookup("MOVIE_CATALOG_TIMEOUT_MS") {
            self.catalog.timeout_ms = timeout.parse().with_context(|| {
                format!("MOVIE_CATALOG_TIMEOUT_MS must be milliseconds, got {:?}", timeout)
            })?;
        }
        Ok(())
    }
}
