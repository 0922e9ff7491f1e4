use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use otogram_common::storage::s3::S3Settings;
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
    /// `development` or `production`. Error details are hidden in production.
    pub environment: String,
    pub cors: CorsConfig,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Bearer token lifetime. Default: 7 days.
    pub token_ttl_secs: u64,
}

/// Which object store implementation backs media uploads.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemStorageConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Prefix of every public media URL; `{public_base_url}/{key}` addresses an object.
    pub public_base_url: String,
    pub filesystem: FilesystemStorageConfig,
    #[serde(default)]
    pub s3: Option<S3Settings>,
    pub max_video_size: u64,
    pub max_image_size: u64,
}

/// Optional administrator account created on startup if no user holds its email.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_MAX_VIDEO_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("OTOGRAM_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.environment", "development")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 86400)?
            .set_default("database.url", "sqlite://otogram.db?mode=rwc")?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_secs", DEFAULT_TOKEN_TTL_SECS)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.public_base_url", "http://127.0.0.1:5000/api/v1/files")?
            .set_default("storage.filesystem.root", "./data/objects")?
            .set_default("storage.max_video_size", DEFAULT_MAX_VIDEO_SIZE)?
            .set_default("storage.max_image_size", DEFAULT_MAX_IMAGE_SIZE)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., OTOGRAM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("OTOGRAM").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.jwt_secret must be set (OTOGRAM__AUTH__JWT_SECRET)".into(),
            ));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "auth.token_ttl_secs must be positive".into(),
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.s3.is_none() {
            return Err(ConfigError::Message(
                "storage.backend = \"s3\" requires a [storage.s3] section".into(),
            ));
        }
        if self.storage.max_video_size == 0 || self.storage.max_image_size == 0 {
            return Err(ConfigError::Message(
                "storage.max_video_size and storage.max_image_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
