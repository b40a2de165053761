use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{MetadataDirective, ObjectCannedAcl};
use chrono::Utc;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use thiserror::Error;

use crate::config::StorageConfig;
use crate::infrastructure::credentials::CredentialProvider;
use crate::services::post_policy::{PostPolicyRequest, sign_post_policy};
use crate::services::profiles::{Acl, ContentDisposition};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object `{key}` not found")]
    NotFound { key: String },

    #[error("storage backend {operation} failed for `{key}`: {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },
}

/// One condition of a POST upload policy, enforced by the storage backend
/// itself when the client performs the actual upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCondition {
    /// The named form field must carry exactly this value.
    ExactMatch { field: String, value: String },
    /// The uploaded body must be within these inclusive byte bounds.
    ContentLengthRange { min: u64, max: u64 },
}

impl PolicyCondition {
    pub fn exact_match(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ExactMatch { field: field.into(), value: value.into() }
    }
}

/// Everything a client needs for one direct upload: the form target URL and
/// the form fields to send with the file.
#[derive(Debug, Clone)]
pub struct PresignedPost {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

/// Metadata of a stored object, as returned by a head lookup.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// Server-side copy request with rotated visibility and headers.
#[derive(Debug, Clone)]
pub struct CopyRequest<'a> {
    pub source_key: &'a str,
    pub dest_key: &'a str,
    pub acl: Acl,
    pub content_type: String,
    pub content_disposition: ContentDisposition,
    /// Replaces the destination metadata wholesale.
    pub metadata: HashMap<String, String>,
}

/// The storage backend as this engine sees it: presigned-policy generation,
/// metadata lookup, and server-side copy. The wire protocol behind these is
/// not this crate's concern.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn generate_presigned_post(
        &self,
        key: &str,
        fields: &BTreeMap<String, String>,
        conditions: &[PolicyCondition],
        expires_in: u64,
    ) -> Result<PresignedPost, StorageError>;

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError>;

    async fn copy_object(&self, request: CopyRequest<'_>) -> Result<(), StorageError>;

    /// Public URL of an object, composed of endpoint host, bucket and key.
    fn object_url(&self, key: &str) -> String;
}

/// Characters percent-encoded in `x-amz-copy-source` values. Keys may carry
/// spaces from sanitized filenames.
const COPY_SOURCE_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'#').add(b'?');

pub struct S3StorageBackend {
    client: Client,
    bucket: String,
    endpoint: String,
    region: String,
    credentials: CredentialProvider,
}

impl S3StorageBackend {
    pub fn new(client: Client, config: &StorageConfig, credentials: CredentialProvider) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            endpoint: config.endpoint(),
            region: config.signing_region().to_string(),
            credentials,
        }
    }
}

#[async_trait]
impl StorageBackend for S3StorageBackend {
    async fn generate_presigned_post(
        &self,
        key: &str,
        fields: &BTreeMap<String, String>,
        conditions: &[PolicyCondition],
        expires_in: u64,
    ) -> Result<PresignedPost, StorageError> {
        let credentials = self.credentials.resolve().await;
        let (Some(access_key), Some(secret_key)) =
            (credentials.access_key.as_deref(), credentials.secret_key.as_deref())
        else {
            return Err(StorageError::Backend {
                operation: "generate_presigned_post",
                key: key.to_string(),
                message: "no credentials available".to_string(),
            });
        };

        let request = PostPolicyRequest {
            bucket: &self.bucket,
            key,
            fields,
            conditions,
            expires_in,
            region: &self.region,
            access_key,
            secret_key,
            session_token: credentials.session_token.as_deref(),
        };

        Ok(PresignedPost {
            url: format!("{}/{}", self.endpoint, self.bucket),
            fields: sign_post_policy(&request, Utc::now()),
        })
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(output) => Ok(ObjectHead {
                content_type: output
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string(),
                metadata: output.metadata().cloned().unwrap_or_default(),
            }),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Err(StorageError::NotFound { key: key.to_string() })
                } else {
                    Err(StorageError::Backend {
                        operation: "head_object",
                        key: key.to_string(),
                        message: service_error.to_string(),
                    })
                }
            }
        }
    }

    async fn copy_object(&self, request: CopyRequest<'_>) -> Result<(), StorageError> {
        let copy_source = utf8_percent_encode(
            &format!("{}/{}", self.bucket, request.source_key),
            COPY_SOURCE_ENCODE_SET,
        )
        .to_string();

        let res = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source)
            .key(request.dest_key)
            .acl(ObjectCannedAcl::from(request.acl.as_str()))
            .content_type(&request.content_type)
            .content_disposition(request.content_disposition.as_str())
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(request.metadata.clone()))
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 copy_object failed: source={}/{}, dest={}, error={:?}",
                self.bucket,
                request.source_key,
                request.dest_key,
                e
            );
            return Err(StorageError::Backend {
                operation: "copy_object",
                key: request.source_key.to_string(),
                message: e.to_string(),
            });
        }
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}
