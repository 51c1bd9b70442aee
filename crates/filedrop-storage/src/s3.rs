use crate::keys;
use crate::post_policy::{sign_post_policy, PostPolicyParams};
use crate::retry::{with_backoff, RetryPolicy};
use crate::traits::{ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, ProvideCredentials};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLifecycleConfiguration, Delete, ExpirationStatus, LifecycleExpiration, LifecycleRule,
    LifecycleRuleFilter, ObjectIdentifier,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::Utc;
use filedrop_core::models::PresignedUpload;
use filedrop_core::StorageBackend;
use std::time::Duration;

/// Service error codes that may clear on their own and are worth a retry.
const TRANSIENT_ERROR_CODES: &[&str] = &["SlowDown", "InternalError", "ServiceUnavailable"];

/// Batch-delete requests are capped at 1000 keys by the S3 API.
const DELETE_BATCH_SIZE: usize = 1000;

const LIFECYCLE_RULE_ID: &str = "filedrop-expire-guard";

/// S3 object store implementation
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    retry: RetryPolicy,
    // Kept for credential resolution when signing POST policies.
    sdk_config: aws_config::SdkConfig,
}

impl S3ObjectStore {
    /// Create a new S3ObjectStore instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `retry` - Transient-failure retry policy. SDK-level retries are
    ///   disabled so attempts are not multiplied.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        retry: RetryPolicy,
    ) -> StoreResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        // Configure S3 client with custom endpoint if provided (for S3-compatible providers)
        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(RetryConfig::disabled());
            if let Some(provider) = config.credentials_provider() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            // Path-style addressing is required by MinIO and most
            // S3-compatible providers.
            s3_config_builder = s3_config_builder.force_path_style(true);

            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        Ok(S3ObjectStore {
            client,
            bucket,
            region,
            endpoint_url,
            retry,
            sdk_config: config,
        })
    }

    /// Form action URL for POST policy uploads: the bucket endpoint with no key.
    ///
    /// For AWS S3, uses virtual-hosted-style: https://{bucket}.s3.{region}.amazonaws.com
    /// For S3-compatible providers, uses path-style on the custom endpoint.
    fn post_url(&self) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket)
        } else {
            format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region)
        }
    }

    async fn credentials(&self) -> StoreResult<Credentials> {
        let provider = self.sdk_config.credentials_provider().ok_or_else(|| {
            StoreError::Credentials("no credentials provider configured".to_string())
        })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| StoreError::Credentials(e.to_string()))
    }

    /// Install a bucket-wide lifecycle expiration rule of `days` days.
    ///
    /// This is a backstop against orphaned objects surviving sweeper outages;
    /// record-level expiry stays authoritative, so the rule must be set
    /// comfortably beyond the retention window.
    pub async fn ensure_lifecycle_rule(&self, days: i32) -> StoreResult<()> {
        let rule = LifecycleRule::builder()
            .id(LIFECYCLE_RULE_ID)
            .status(ExpirationStatus::Enabled)
            .filter(LifecycleRuleFilter::builder().prefix("").build())
            .expiration(LifecycleExpiration::builder().days(days).build())
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let lifecycle = BucketLifecycleConfiguration::builder()
            .rules(rule)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(&self.bucket)
            .lifecycle_configuration(lifecycle)
            .send()
            .await
            .map_err(|e| classify_sdk_error("put_bucket_lifecycle_configuration", e))?;

        tracing::info!(
            bucket = %self.bucket,
            days = days,
            "S3 lifecycle expiration rule installed"
        );

        Ok(())
    }
}

/// Map an SDK error onto the store error taxonomy. Throttling and
/// server-side 5xx codes plus connection-level timeouts and dispatch
/// failures are transient; everything else is a backend error.
fn classify_sdk_error<E>(operation: &str, err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let SdkError::ServiceError(ctx) = &err {
        let code = ctx.err().code().unwrap_or("Unknown").to_string();
        let message = ctx.err().message().unwrap_or("no message").to_string();
        return if TRANSIENT_ERROR_CODES.contains(&code.as_str()) {
            StoreError::Transient { code, message }
        } else {
            StoreError::Backend(format!("{} failed ({}): {}", operation, code, message))
        };
    }

    match &err {
        SdkError::TimeoutError(_) => StoreError::Transient {
            code: "TimeoutError".to_string(),
            message: format!("{} timed out", operation),
        },
        SdkError::DispatchFailure(_) => StoreError::Transient {
            code: "DispatchFailure".to_string(),
            message: format!("{}: {}", operation, DisplayErrorContext(&err)),
        },
        _ => StoreError::Backend(format!("{} failed: {}", operation, DisplayErrorContext(&err))),
    }
}

/// Content-Disposition header value forcing a download with the original
/// filename. Non-ASCII and quote-bearing names get an RFC 5987 encoded
/// `filename*` alongside an ASCII fallback.
fn attachment_disposition(filename: &str) -> String {
    let needs_escaping = !filename.is_ascii()
        || filename
            .chars()
            .any(|c| c == '"' || c == '\\' || c.is_ascii_control());

    if !needs_escaping {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || !(c.is_ascii_graphic() || c == ' ') {
                '_'
            } else {
                c
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()> {
        keys::validate_key(key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        // The request body is not reusable across attempts, so the request
        // is rebuilt from the borrowed bytes on every retry.
        let result = with_backoff(self.retry, "put_object", || {
            let request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(data.clone()));
            async move {
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| classify_sdk_error("put_object", e))
            }
        })
        .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put successful"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                Err(err)
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        keys::validate_key(key)?;
        let start = std::time::Instant::now();

        let request = self.client.get_object().bucket(&self.bucket).key(key);
        let result = with_backoff(self.retry, "get_object", || {
            let request = request.clone();
            async move {
                match request.send().await {
                    Ok(output) => Ok(Some(output)),
                    Err(err) => {
                        if let SdkError::ServiceError(ctx) = &err {
                            if matches!(ctx.err(), GetObjectError::NoSuchKey(_)) {
                                return Ok(None);
                            }
                        }
                        Err(classify_sdk_error("get_object", err))
                    }
                }
            }
        })
        .await;

        let output = match result {
            Ok(Some(output)) => output,
            Ok(None) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "S3 object absent");
                return Ok(None);
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                return Err(err);
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(format!("get_object body read failed: {}", e)))?;
        let bytes = data.into_bytes();

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(Some(bytes))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        keys::validate_key(key)?;

        let request = self.client.head_object().bucket(&self.bucket).key(key);
        with_backoff(self.retry, "head_object", || {
            let request = request.clone();
            async move {
                match request.send().await {
                    Ok(_) => Ok(true),
                    Err(err) => {
                        if let SdkError::ServiceError(ctx) = &err {
                            if matches!(ctx.err(), HeadObjectError::NotFound(_)) {
                                return Ok(false);
                            }
                        }
                        Err(classify_sdk_error("head_object", err))
                    }
                }
            }
        })
        .await
    }

    async fn list_prefixes(&self) -> StoreResult<Vec<String>> {
        let mut prefixes = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .delimiter("/");
            if let Some(ref token) = continuation {
                request = request.continuation_token(token);
            }

            let page = with_backoff(self.retry, "list_objects_v2", || {
                let request = request.clone();
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error("list_objects_v2", e))
                }
            })
            .await?;

            for common_prefix in page.common_prefixes() {
                if let Some(prefix) = common_prefix.prefix() {
                    prefixes.push(prefix.trim_end_matches('/').to_string());
                }
            }

            match page.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(prefixes)
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut found = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(format!("{}/", prefix));
            if let Some(ref token) = continuation {
                request = request.continuation_token(token);
            }

            let page = with_backoff(self.retry, "list_objects_v2", || {
                let request = request.clone();
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error("list_objects_v2", e))
                }
            })
            .await?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    found.push(key.to_string());
                }
            }

            match page.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(found)
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let start = std::time::Instant::now();

        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let mut objects = Vec::with_capacity(chunk.len());
            for key in chunk {
                objects.push(
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| StoreError::Backend(format!("delete target {}: {}", key, e)))?,
                );
            }

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            let request = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete);

            let output = match with_backoff(self.retry, "delete_objects", || {
                let request = request.clone();
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error("delete_objects", e))
                }
            })
            .await
            {
                Ok(output) => output,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        bucket = %self.bucket,
                        keys = keys.len(),
                        "S3 delete failed"
                    );
                    return Err(err);
                }
            };

            // Quiet mode still reports per-key failures.
            let errors = output.errors();
            if !errors.is_empty() {
                let first = &errors[0];
                return Err(StoreError::Backend(format!(
                    "delete_objects left {} objects undeleted: {} ({})",
                    errors.len(),
                    first.key().unwrap_or("unknown key"),
                    first.code().unwrap_or("Unknown"),
                )));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            keys = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        max_bytes: u64,
        ttl: Duration,
    ) -> StoreResult<PresignedUpload> {
        keys::validate_key(key)?;
        let credentials = self.credentials().await?;

        sign_post_policy(&PostPolicyParams {
            url: self.post_url(),
            bucket: &self.bucket,
            key,
            content_type,
            max_bytes,
            region: &self.region,
            access_key_id: credentials.access_key_id(),
            secret_access_key: credentials.secret_access_key(),
            session_token: credentials.session_token(),
            now: Utc::now(),
            ttl,
        })
    }

    async fn presign_download(
        &self,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> StoreResult<String> {
        keys::validate_key(key)?;

        let presigning_config = PresigningConfig::builder()
            .expires_in(ttl)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(attachment_disposition(filename))
            .presigned(presigning_config)
            .await
            .map_err(|e| classify_sdk_error("presign_get_object", e))?;

        Ok(presigned_request.uri().to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
