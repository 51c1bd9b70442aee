//! Storage key layout.
//!
//! Key derivation lives here so every backend and caller agrees on the
//! per-item namespace.

use crate::traits::{StoreError, StoreResult};

/// Fixed object name of the metadata record within an item's prefix.
pub const METADATA_OBJECT: &str = "metadata.json";

/// Key of the metadata record for an item.
pub fn metadata_key(file_id: &str) -> String {
    format!("{}/{}", file_id, METADATA_OBJECT)
}

/// Key of the content object for an item.
pub fn content_key(file_id: &str, filename: &str) -> String {
    format!("{}/{}", file_id, filename)
}

/// Validate a key before handing it to a backend. Rejects empty keys,
/// absolute paths, and `..` traversal segments.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|segment| segment == "..")
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_key_is_fixed_within_prefix() {
        assert_eq!(
            metadata_key("0a1b2c3d-0000-0000-0000-000000000000"),
            "0a1b2c3d-0000-0000-0000-000000000000/metadata.json"
        );
    }

    #[test]
    fn content_key_uses_original_filename() {
        assert_eq!(content_key("abc", "report.pdf"), "abc/report.pdf");
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(validate_key("abc/../secret").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn normal_keys_pass_validation() {
        assert!(validate_key("abc/metadata.json").is_ok());
        assert!(validate_key("abc/some file.txt").is_ok());
        assert!(validate_key("abc/..double.dots.ok").is_ok());
    }
}
