//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use filedrop_core::{Config, StorageBackend};

/// Validate critical configuration values
///
/// Checks that critical configuration is set correctly and will fail fast if
/// there are issues that could cause security problems or runtime errors.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.storage_backend == StorageBackend::Local {
        tracing::warn!(
            "Local storage backend in production - upload credentials are not signed and the \
             service itself must be reachable at LOCAL_STORAGE_BASE_URL"
        );
    }

    Ok(())
}
