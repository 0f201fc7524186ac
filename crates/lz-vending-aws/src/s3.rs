//! S3 adapters: the bucket policy holding the trust boundary, and template objects.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use lz_vending_core::{
    BlobStore, PolicyStore, PolicyWrite, ServiceError, ServiceResult, TrustPolicyDocument,
    VersionedPolicy,
};

use crate::sdk::service_error;

const SERVICE: &str = "s3";

/// Version token for a policy text: hex SHA-256 of the stored bytes.
///
/// Bucket policies carry no native version, so the digest of what S3 returns
/// stands in for one.
#[must_use]
pub fn policy_version(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// [`PolicyStore`] where a location is a bucket name and the document is its bucket policy.
#[derive(Debug, Clone)]
pub struct S3PolicyStore {
    client: Client,
}

impl S3PolicyStore {
    /// Create an adapter from the shared SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn read_text(&self, bucket: &str) -> ServiceResult<String> {
        let output = self
            .client
            .get_bucket_policy()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| {
                if err.code() == Some("NoSuchBucketPolicy") {
                    ServiceError::not_found(SERVICE, format!("bucket {bucket} has no policy"))
                } else {
                    service_error(SERVICE, &err)
                }
            })?;

        output
            .policy()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::not_found(SERVICE, format!("bucket {bucket} has no policy")))
    }
}

#[async_trait]
impl PolicyStore for S3PolicyStore {
    async fn get_document(&self, location: &str) -> ServiceResult<VersionedPolicy> {
        let text = self.read_text(location).await?;
        let document = TrustPolicyDocument::parse(&text)
            .map_err(|e| ServiceError::rejected(SERVICE, "MalformedPolicy", e.to_string()))?;
        Ok(VersionedPolicy {
            version: policy_version(&text),
            document,
        })
    }

    async fn put_document(
        &self,
        location: &str,
        document: &TrustPolicyDocument,
        write: PolicyWrite<'_>,
    ) -> ServiceResult<()> {
        // S3 has no conditional bucket-policy write; compare digests right before
        // writing to narrow the race window.
        if let Some(expected) = write.expected_version {
            let current = policy_version(&self.read_text(location).await?);
            if current != expected {
                warn!(bucket = %location, "Bucket policy changed since it was read");
                return Err(ServiceError::conflict(
                    SERVICE,
                    format!("bucket policy of {location} is at {current}, expected {expected}"),
                ));
            }
        }

        self.client
            .put_bucket_policy()
            .bucket(location)
            .confirm_remove_self_bucket_access(write.acknowledge_self_lockout_risk)
            .policy(document.to_json())
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        debug!(bucket = %location, "Bucket policy written");
        Ok(())
    }
}

/// [`BlobStore`] backed by S3 objects.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    /// Create an adapter from the shared SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get_object(&self, bucket: &str, key: &str) -> ServiceResult<Vec<u8>> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) => {
                return Err(ServiceError::not_found(
                    SERVICE,
                    format!("s3://{bucket}/{key} does not exist"),
                ));
            }
            Err(err) => return Err(service_error(SERVICE, &err)),
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| ServiceError::unavailable(SERVICE, e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}
