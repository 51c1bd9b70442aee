//! Shared-item metadata records and the upload/download API shapes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Write-once metadata record stored at `{file_id}/metadata.json`.
///
/// Timestamps are RFC 3339 strings. `expiration_time` is parsed leniently on
/// read: read paths must treat a record whose expiry cannot be parsed as
/// already expired rather than serving it forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub original_filename: String,
    pub content_type: String,
    #[serde(with = "string_u64")]
    pub file_size: u64,
    pub upload_time: String,
    pub expiration_time: String,
}

impl ShareRecord {
    pub fn new(
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        file_size: u64,
        uploaded_at: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            file_size,
            upload_time: uploaded_at.to_rfc3339(),
            expiration_time: (uploaded_at + retention).to_rfc3339(),
        }
    }

    /// Parsed expiry, or `None` when the stored value is unreadable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expiration_time)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Liveness check for read paths. An unparseable expiry counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires) => now > expires,
            None => true,
        }
    }
}

/// `file_size` is persisted as a string-encoded integer; accept both
/// encodings on read.
mod string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.parse::<u64>().map_err(serde::de::Error::custom),
        }
    }
}

/// Presigned upload credential: form action URL plus the fields the client
/// must POST alongside the file bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PresignedUpload {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

/// Body of `POST /upload`.
///
/// Fields are optional at the serde level so the handler can report exactly
/// which constraint was violated, in order.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct UploadRequest {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub file_id: Uuid,
    pub upload_data: PresignedUpload,
    pub download_path: String,
    pub expiration_time: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    pub download_url: String,
    pub filename: String,
    pub content_type: String,
    pub expiration_time: String,
}

/// Outcome of one cleanup sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CleanupSummary {
    /// Identifier prefixes examined.
    pub checked: u64,
    /// Item groups whose objects were deleted.
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_file_size_as_string() {
        let uploaded = Utc::now();
        let record = ShareRecord::new("a.txt", "text/plain", 100, uploaded, Duration::hours(24));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["original_filename"], "a.txt");
        assert_eq!(json["content_type"], "text/plain");
        assert_eq!(json["file_size"], "100");
        assert!(json["upload_time"].is_string());
        assert!(json["expiration_time"].is_string());
    }

    #[test]
    fn record_round_trips() {
        let record = ShareRecord::new(
            "report.pdf",
            "application/pdf",
            1024,
            Utc::now(),
            Duration::hours(24),
        );
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ShareRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn numeric_file_size_is_accepted() {
        let json = r#"{
            "original_filename": "a.txt",
            "content_type": "text/plain",
            "file_size": 100,
            "upload_time": "2026-01-01T00:00:00Z",
            "expiration_time": "2026-01-02T00:00:00Z"
        }"#;
        let record: ShareRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.file_size, 100);
    }

    #[test]
    fn expiry_in_future_is_live() {
        let now = Utc::now();
        let record = ShareRecord::new("a.txt", "text/plain", 1, now, Duration::hours(24));
        assert!(!record.is_expired(now));
        assert!(!record.is_expired(now + Duration::hours(23)));
        assert!(record.is_expired(now + Duration::hours(25)));
    }

    #[test]
    fn unparseable_expiry_counts_as_expired() {
        let mut record =
            ShareRecord::new("a.txt", "text/plain", 1, Utc::now(), Duration::hours(24));
        record.expiration_time = "not-a-timestamp".to_string();
        assert!(record.expires_at().is_none());
        assert!(record.is_expired(Utc::now()));
    }

    #[test]
    fn expires_at_parses_rfc3339() {
        let record = ShareRecord {
            original_filename: "a.txt".to_string(),
            content_type: "text/plain".to_string(),
            file_size: 1,
            upload_time: "2026-01-01T00:00:00+00:00".to_string(),
            expiration_time: "2026-01-02T00:00:00+00:00".to_string(),
        };
        let expires = record.expires_at().unwrap();
        assert_eq!(expires.to_rfc3339(), "2026-01-02T00:00:00+00:00");
    }
}
