use std::env;

/// Storage and signing configuration for direct S3 uploads
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket all upload policies and download copies target
    pub bucket: String,

    /// Bucket region; `None` falls back to the provider default
    pub region: Option<String>,

    /// Custom endpoint (e.g. a local MinIO), used verbatim when set
    pub endpoint_url: Option<String>,

    /// Statically configured access key id
    pub access_key: Option<String>,

    /// Statically configured secret access key
    pub secret_key: Option<String>,

    /// Secret for validating principal bearer tokens
    pub jwt_secret: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "uploads".to_string(),
            region: None,
            endpoint_url: None,
            access_key: None,
            secret_key: None,
            jwt_secret: "secret".to_string(),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl StorageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket: env_non_empty("AWS_STORAGE_BUCKET_NAME").unwrap_or(default.bucket),

            region: env_non_empty("AWS_S3_DIRECT_REGION"),

            endpoint_url: env_non_empty("AWS_S3_ENDPOINT_URL"),

            // The S3-scoped variables win over the generic AWS pair
            access_key: env_non_empty("AWS_S3_ACCESS_KEY_ID")
                .or_else(|| env_non_empty("AWS_ACCESS_KEY_ID")),

            secret_key: env_non_empty("AWS_S3_SECRET_ACCESS_KEY")
                .or_else(|| env_non_empty("AWS_SECRET_ACCESS_KEY")),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
        }
    }

    /// Create config for development against a local MinIO
    pub fn development() -> Self {
        Self {
            bucket: "uploads".to_string(),
            region: None,
            endpoint_url: Some("http://127.0.0.1:9000".to_string()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            jwt_secret: "secret".to_string(),
        }
    }

    /// Resolve the storage endpoint.
    ///
    /// A custom endpoint is used verbatim. Otherwise a regional endpoint is
    /// derived, with the special case that the default/primary region
    /// (us-east-1) maps to the provider's global endpoint rather than a
    /// region-qualified one.
    pub fn endpoint(&self) -> String {
        if let Some(endpoint_url) = &self.endpoint_url {
            return endpoint_url.trim_end_matches('/').to_string();
        }
        match self.region.as_deref() {
            None | Some("us-east-1") => "https://s3.amazonaws.com".to_string(),
            Some(region) => format!("https://s3-{region}.amazonaws.com"),
        }
    }

    /// Region used for request signing
    pub fn signing_region(&self) -> &str {
        self.region.as_deref().unwrap_or("us-east-1")
    }
}
