use crate::keys;
use crate::traits::{ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use filedrop_core::models::PresignedUpload;
use filedrop_core::StorageBackend;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem object store for development and tests.
///
/// Keys map directly to paths under `base_path`, so the on-disk layout is
/// `{base_path}/{file_id}/metadata.json` next to the content file. Upload
/// credentials are unsigned; they only mirror the S3 form shape so clients
/// behave identically against either backend.
#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a new LocalObjectStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "./data")
    /// * `base_url` - Base URL advertised in upload/download URLs
    ///   (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StoreResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalObjectStore {
            base_path,
            base_url,
        })
    }

    fn key_to_path(&self, key: &str) -> StoreResult<PathBuf> {
        keys::validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    fn object_url(&self, key: &str) -> String {
        // Encode per segment so the `/` separators survive.
        let encoded = key
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url.trim_end_matches('/'), encoded)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StoreResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StoreError::Backend(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StoreError::Backend(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StoreError::Backend(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::read(&path).await {
            Ok(data) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    size_bytes = data.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage get successful"
                );
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn list_prefixes(&self) -> StoreResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Backend(format!(
                    "Failed to list {}: {}",
                    self.base_path.display(),
                    e
                )))
            }
        };

        let mut prefixes = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    prefixes.push(name.to_string());
                }
            }
        }

        Ok(prefixes)
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let root = self.key_to_path(prefix)?;
        let mut found = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // An absent prefix has no keys.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StoreError::Backend(format!(
                        "Failed to list {}: {}",
                        dir.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_path) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    found.push(key);
                }
            }
        }

        Ok(found)
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<()> {
        let start = std::time::Instant::now();

        for key in keys {
            let path = self.key_to_path(key)?;
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::Backend(format!(
                        "Failed to delete file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }

            // Drop the item directory once emptied; remove_dir refuses
            // while siblings remain.
            if let Some(parent) = path.parent() {
                if parent != self.base_path {
                    let _ = fs::remove_dir(parent).await;
                }
            }
        }

        tracing::info!(
            keys = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        _max_bytes: u64,
        _ttl: Duration,
    ) -> StoreResult<PresignedUpload> {
        keys::validate_key(key)?;

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        fields.insert("Content-Type".to_string(), content_type.to_string());

        Ok(PresignedUpload {
            url: self.object_url(key),
            fields,
        })
    }

    async fn presign_download(
        &self,
        key: &str,
        filename: &str,
        _ttl: Duration,
    ) -> StoreResult<String> {
        keys::validate_key(key)?;
        Ok(format!(
            "{}?filename={}",
            self.object_url(key),
            urlencoding::encode(filename)
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalObjectStore {
        LocalObjectStore::new(dir, "http://localhost:4000/files".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        let data = Bytes::from_static(b"{\"original_filename\":\"a.txt\"}");
        store
            .put("abc/metadata.json", data.clone(), "application/json")
            .await
            .unwrap();

        let read_back = store.get("abc/metadata.json").await.unwrap();
        assert_eq!(read_back, Some(data));
    }

    #[tokio::test]
    async fn test_get_absent_key_is_none() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        assert_eq!(store.get("missing/metadata.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_exists_reflects_stored_keys() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        store
            .put("abc/file.txt", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap();

        assert!(store.exists("abc/file.txt").await.unwrap());
        assert!(!store.exists("abc/other.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        let result = store.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));

        let result = store
            .put("/etc/passwd", Bytes::from_static(b"x"), "text/plain")
            .await;
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));

        let result = store.exists("abc/../secret").await;
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_list_prefixes_returns_top_level_ids() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        store
            .put("id-one/metadata.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        store
            .put("id-two/metadata.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        let mut prefixes = store.list_prefixes().await.unwrap();
        prefixes.sort();
        assert_eq!(prefixes, vec!["id-one", "id-two"]);
    }

    #[tokio::test]
    async fn test_list_keys_covers_one_prefix_only() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        store
            .put("abc/metadata.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        store
            .put("abc/report.pdf", Bytes::from_static(b"pdf"), "application/pdf")
            .await
            .unwrap();
        store
            .put("other/metadata.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        let mut keys = store.list_keys("abc").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["abc/metadata.json", "abc/report.pdf"]);

        assert!(store.list_keys("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_many_removes_files_and_empty_dirs() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        store
            .put("abc/metadata.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        store
            .put("abc/report.pdf", Bytes::from_static(b"pdf"), "application/pdf")
            .await
            .unwrap();

        store
            .delete_many(&["abc/metadata.json".to_string(), "abc/report.pdf".to_string()])
            .await
            .unwrap();

        assert!(!store.exists("abc/metadata.json").await.unwrap());
        assert!(store.list_prefixes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_many_tolerates_absent_keys() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        let result = store.delete_many(&["never/existed.txt".to_string()]).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_presigned_upload_matches_the_s3_form_shape() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        let upload = store
            .presign_upload("abc/a.txt", "text/plain", 1024, Duration::from_secs(300))
            .await
            .unwrap();

        assert_eq!(upload.url, "http://localhost:4000/files/abc/a.txt");
        assert_eq!(upload.fields["key"], "abc/a.txt");
        assert_eq!(upload.fields["Content-Type"], "text/plain");
    }

    #[tokio::test]
    async fn test_presigned_download_encodes_the_filename() {
        let dir = tempdir().unwrap();
        let store = storage(dir.path()).await;

        let url = store
            .presign_download("abc/my file.txt", "my file.txt", Duration::from_secs(900))
            .await
            .unwrap();

        assert_eq!(
            url,
            "http://localhost:4000/files/abc/my%20file.txt?filename=my%20file.txt"
        );
    }
}
