//! Object store client over the S3 API.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Configuration for the object store.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for most S3-compatible providers)
    pub region: String,
}

impl ObjectStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("OBJECT_STORE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("OBJECT_STORE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("OBJECT_STORE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("OBJECT_STORE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("OBJECT_STORE_SECRET_ACCESS_KEY").map_err(|_| {
                StorageError::config_error("OBJECT_STORE_SECRET_ACCESS_KEY not set")
            })?,
            bucket_name: std::env::var("OBJECT_STORE_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("OBJECT_STORE_BUCKET_NAME not set"))?,
            region: std::env::var("OBJECT_STORE_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// S3-compatible object store client.
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Client,
    bucket: String,
    /// Endpoint host without scheme, for public URL construction
    endpoint_host: String,
}

impl ObjectStoreClient {
    /// Create a new client from configuration.
    pub fn new(config: ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "mmsearch",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let endpoint_host = config
            .endpoint_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            endpoint_host,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(ObjectStoreConfig::from_env()?))
    }

    /// Upload a local file and return its public URL.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let url = self.public_url(key);
        info!("Uploaded {} to {}", path.display(), url);
        Ok(url)
    }

    /// Public URL of an object, virtual-host style.
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.{}/{}", self.bucket, self.endpoint_host, key)
    }

    /// Fresh object key for an uploaded audio file.
    pub fn audio_key(prefix: &str) -> String {
        format!("{}/{}.wav", prefix.trim_end_matches('/'), Uuid::new_v4())
    }

    /// Delete an object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    /// Check connectivity with a head-bucket call.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("connectivity check failed: {e}")))?;
        Ok(())
    }
}
