//! Configuration module
//!
//! All settings are static environment configuration loaded once at startup;
//! there is no dynamic reconfiguration.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Defaults
const SERVER_PORT: u16 = 4000;
const MAX_FILE_SIZE_MB: u64 = 10;
const UPLOAD_URL_EXPIRY_SECS: u64 = 300;
const DOWNLOAD_URL_EXPIRY_SECS: u64 = 900;
const RETENTION_HOURS: i64 = 24;
const STORE_MAX_RETRIES: u32 = 3;
const CLEANUP_INTERVAL_SECS: u64 = 3600;
const LIFECYCLE_GUARD_DAYS: i32 = 2;

/// Content types accepted for upload unless overridden via ALLOWED_CONTENT_TYPES.
const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/csv",
    "application/zip",
    "application/x-zip-compressed",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "video/mp4",
    "video/quicktime",
    "audio/mpeg",
    "audio/mp4",
];

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Upload constraints
    pub max_file_size_mb: u64,
    pub allowed_content_types: Vec<String>,
    // Credential and retention windows
    pub upload_url_expiry_secs: u64,
    pub download_url_expiry_secs: u64,
    pub retention_hours: i64,
    // Store client behavior
    pub store_max_retries: u32,
    // Cleanup
    pub cleanup_interval_secs: u64,
    pub lifecycle_guard_days: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| StorageBackend::from_str(&s))
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                DEFAULT_ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|t| t.to_string())
                    .collect()
            });

        let config = Config {
            server_host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            cors_origins,
            environment,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data".to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/files".to_string()),
            max_file_size_mb: env::var("MAX_FILE_SIZE_MB")
                .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
                .parse()
                .unwrap_or(MAX_FILE_SIZE_MB),
            allowed_content_types,
            upload_url_expiry_secs: env::var("UPLOAD_URL_EXPIRY_SECS")
                .unwrap_or_else(|_| UPLOAD_URL_EXPIRY_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_URL_EXPIRY_SECS),
            download_url_expiry_secs: env::var("DOWNLOAD_URL_EXPIRY_SECS")
                .unwrap_or_else(|_| DOWNLOAD_URL_EXPIRY_SECS.to_string())
                .parse()
                .unwrap_or(DOWNLOAD_URL_EXPIRY_SECS),
            retention_hours: env::var("RETENTION_HOURS")
                .unwrap_or_else(|_| RETENTION_HOURS.to_string())
                .parse()
                .unwrap_or(RETENTION_HOURS),
            store_max_retries: env::var("STORE_MAX_RETRIES")
                .unwrap_or_else(|_| STORE_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(STORE_MAX_RETRIES),
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| CLEANUP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(CLEANUP_INTERVAL_SECS),
            lifecycle_guard_days: env::var("LIFECYCLE_GUARD_DAYS")
                .unwrap_or_else(|_| LIFECYCLE_GUARD_DAYS.to_string())
                .parse()
                .unwrap_or(LIFECYCLE_GUARD_DAYS),
        };

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Whether a content type is on the upload allow-list (case-insensitive).
    pub fn content_type_allowed(&self, content_type: &str) -> bool {
        let normalized = content_type.to_lowercase();
        self.allowed_content_types.iter().any(|t| *t == normalized)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours)
    }

    pub fn upload_url_expiry(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upload_url_expiry_secs)
    }

    pub fn download_url_expiry(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.download_url_expiry_secs)
    }

    /// Validate critical configuration values; fail fast on misconfiguration.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES must contain at least one content type"
            ));
        }

        if self.upload_url_expiry_secs == 0 || self.download_url_expiry_secs == 0 {
            return Err(anyhow::anyhow!(
                "Presigned URL expiry values must be greater than 0"
            ));
        }

        if self.retention_hours <= 0 {
            return Err(anyhow::anyhow!("RETENTION_HOURS must be greater than 0"));
        }

        if self.store_max_retries == 0 {
            return Err(anyhow::anyhow!("STORE_MAX_RETRIES must be at least 1"));
        }

        if self.storage_backend == StorageBackend::S3 && self.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when using the s3 storage backend"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: "./data".to_string(),
            local_storage_base_url: "http://localhost:4000/files".to_string(),
            max_file_size_mb: 10,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            upload_url_expiry_secs: 300,
            download_url_expiry_secs: 900,
            retention_hours: 24,
            store_max_retries: 3,
            cleanup_interval_secs: 3600,
            lifecycle_guard_days: 2,
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn content_type_allowlist_is_case_insensitive() {
        let config = test_config();
        assert!(config.content_type_allowed("text/plain"));
        assert!(config.content_type_allowed("Text/Plain"));
        assert!(!config.content_type_allowed("application/x-executable"));
    }

    #[test]
    fn max_file_size_converts_to_bytes() {
        let config = test_config();
        assert_eq!(config.max_file_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn production_rejects_wildcard_cors() {
        let mut config = test_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.cors_origins = vec!["https://share.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket() {
        let mut config = test_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("file-sharing".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_retention_rejected() {
        let mut config = test_config();
        config.retention_hours = 0;
        assert!(config.validate().is_err());
    }
}
