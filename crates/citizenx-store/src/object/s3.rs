use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, ServerSideEncryption, StorageClass};
use tracing::{debug, info};

use crate::StoreError;
use crate::object::{ObjectStore, detect_content_type, public_url};

/// Uploads to an S3 bucket. Objects are publicly readable and served from `base_url`.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3ObjectStore {
    /// Builds a client from the ambient AWS configuration (environment, profile, IMDS).
    pub async fn from_env(bucket: impl Into<String>, base_url: Option<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let bucket = bucket.into();
        let base_url = base_url.unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));

        info!("uploading images to bucket {bucket}, served from {base_url}");
        Self {
            client: Client::new(&config),
            bucket,
            base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, StoreError> {
        let content_type = detect_content_type(&body);
        debug!("put {key} ({} bytes, {content_type})", body.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .content_disposition("attachment")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .storage_class(StorageClass::IntelligentTiering)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                StoreError::ObjectStore(format!(
                    "failed to upload {key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(public_url(&self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires AWS credentials and AWS_BUCKET"]
    async fn upload_to_real_bucket() {
        let bucket = std::env::var("AWS_BUCKET").unwrap();
        let store = S3ObjectStore::from_env(bucket, None).await;

        let url = store
            .put_object("0_citizenx-test.txt", b"hello".to_vec())
            .await
            .unwrap();
        assert!(url.ends_with("/0_citizenx-test.txt"));
    }
}
