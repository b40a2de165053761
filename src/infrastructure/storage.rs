use std::sync::Arc;
use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::config::Region;
use tracing::info;

use crate::config::StorageConfig;
use crate::infrastructure::credentials::CredentialProvider;
use crate::services::storage::S3StorageBackend;

pub async fn setup_storage(config: &StorageConfig) -> Arc<S3StorageBackend> {
    let endpoint_url = config.endpoint();
    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, config.bucket);

    // Backend calls are blocking network operations; keep them bounded so a
    // wedged backend cannot pin request handlers.
    let timeout_config = TimeoutConfig::builder()
        .operation_timeout(Duration::from_secs(30))
        .operation_attempt_timeout(Duration::from_secs(10))
        .build();

    let mut loader = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(config.signing_region().to_string()))
        .timeout_config(timeout_config);

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ));
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        // Local emulators route by path, not virtual host
        .force_path_style(config.endpoint_url.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3StorageBackend::new(
        s3_client,
        config,
        CredentialProvider::new(config),
    ))
}
