//! Storage client speaking Supabase Storage's S3-compatible endpoint
//! (`<SUPABASE_URL>/storage/v1/s3`), per §6. Every operation takes its
//! bucket explicitly: session artifacts and editor exports live in separate
//! buckets (`AUTOCLIP_BUCKET` / `AUTOCLIP_EXPORT_BUCKET`).

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Configuration for the Supabase S3-compatible storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl StorageConfig {
    pub fn from_env() -> StorageResult<Self> {
        let supabase_url = std::env::var("SUPABASE_URL")
            .map_err(|_| StorageError::config_error("SUPABASE_URL not set"))?;
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| StorageError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?;

        Ok(Self {
            endpoint_url: format!("{}/storage/v1/s3", supabase_url.trim_end_matches('/')),
            access_key_id: "service_role".to_string(),
            secret_access_key: service_role_key,
            region: std::env::var("SUPABASE_STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

/// Object-store adapter (§4.2). No internal caching; no retries beyond the
/// streaming/buffered upload fallback.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
}

impl StorageClient {
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(&config.access_key_id, &config.secret_access_key, None, None, "supabase");

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self { client: Client::from_conf(sdk_config) })
    }

    pub async fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env()?).await
    }

    /// Upload a local file to `bucket/key`. Attempts a streaming body first;
    /// if the SDK rejects it with a duplex/stream/body/unsupported error, the
    /// whole file is buffered in memory and retried once. Any other error
    /// propagates without a retry.
    pub async fn upload(&self, bucket: &str, key: &str, local_path: impl AsRef<Path>, content_type: &str) -> StorageResult<()> {
        let local_path = local_path.as_ref();
        debug!("uploading {} to {bucket}/{key}", local_path.display());

        let stream_body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let streaming_result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream_body)
            .content_type(content_type)
            .send()
            .await;

        match streaming_result {
            Ok(_) => {
                info!("uploaded {} to {bucket}/{key}", local_path.display());
                Ok(())
            }
            Err(e) if StorageError::is_stream_unsupported(&e.to_string()) => {
                warn!("streaming upload rejected ({e}), falling back to buffered upload");
                let bytes = tokio::fs::read(local_path).await?;
                self.upload_bytes(bucket, key, bytes, content_type).await
            }
            Err(e) => Err(StorageError::upload_failed(e.to_string())),
        }
    }

    /// Upload an in-memory buffer to `bucket/key`.
    pub async fn upload_bytes(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        debug!("uploading {} bytes to {bucket}/{key}", data.len());

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Download `bucket/key` to a caller-named local path (§4.2).
    pub async fn download(&self, bucket: &str, key: &str, local_path: impl AsRef<Path>) -> StorageResult<()> {
        let local_path = local_path.as_ref();
        debug!("downloading {bucket}/{key} to {}", local_path.display());

        let bytes = self.download_bytes(bucket, key).await?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, bytes).await?;

        info!("downloaded {bucket}/{key} to {}", local_path.display());
        Ok(())
    }

    pub async fn download_bytes(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let response = self.client.get_object().bucket(bucket).key(key).send().await.map_err(|e| {
            if e.to_string().contains("NoSuchKey") {
                StorageError::not_found(key)
            } else {
                StorageError::DownloadFailed(e.to_string())
            }
        })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Produce a signed GET URL valid for `ttl`.
    pub async fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(ttl).map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// List up to `limit` objects under `prefix` in `bucket`.
    pub async fn list(&self, bucket: &str, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectInfo>> {
        debug!("listing {bucket}/{prefix}* (limit {limit})");

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| StorageError::ListFailed(e.to_string()))?;

            if let Some(ref contents) = response.contents {
                for obj in contents {
                    objects.push(ObjectInfo {
                        key: obj.key.clone().unwrap_or_default(),
                        size: obj.size.unwrap_or(0) as u64,
                        last_modified: obj.last_modified.as_ref().and_then(|t| t.to_millis().ok()).map(|ms| ms as u64),
                    });
                    if objects.len() >= limit {
                        return Ok(objects);
                    }
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    /// Remove `keys` from `bucket`, for session cleanup.
    pub async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<u32> {
        if keys.is_empty() {
            return Ok(0);
        }

        debug!("deleting {} objects from {bucket}", keys.len());

        let objects: Vec<_> = keys
            .iter()
            .map(|k| aws_sdk_s3::types::ObjectIdentifier::builder().key(k).build().expect("valid key"))
            .collect();

        let delete = aws_sdk_s3::types::Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        self.client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        info!("deleted {} objects from {bucket}", keys.len());
        Ok(keys.len() as u32)
    }

    pub async fn check_connectivity(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("storage connectivity check failed: {e}")))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<u64>,
}
