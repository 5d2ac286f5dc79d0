use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build blob download links.
    pub public_url: String,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider that issues tokens.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded blobs.
    pub root: PathBuf,
    /// Largest accepted upload in bytes.
    pub max_blob_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Delay between polls for pending entries.
    pub poll_interval_ms: u64,
    /// Pending entries processed per poll.
    pub batch_size: u64,
    /// Upper bound on characters per stored chunk.
    pub chunk_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            batch_size: 16,
            chunk_size: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.public_url", "http://127.0.0.1:3000")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.root", "./data/blobs")?
            .set_default("storage.max_blob_size", 32 * 1024 * 1024)?
            .set_default("indexing.poll_interval_ms", 1000)?
            .set_default("indexing.batch_size", 16)?
            .set_default("indexing.chunk_size", 1000)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SUPPORT__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SUPPORT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
