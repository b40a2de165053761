use crate::services::keys::KeyStrategy;
use crate::services::profiles::{Acl, ContentDisposition};
use crate::services::storage::{CopyRequest, StorageBackend, StorageError};

/// Namespace under which download copies are created.
const DOWNLOADS_PREFIX: &str = "downloads";

/// Metadata entry recording which object a download copy was made from.
pub const ORIGINAL_KEY_METADATA: &str = "original-key";

/// Issue a public download URL for a stored object via copy-on-read.
///
/// The original object is never exposed: the source is copied server-side to
/// a fresh key under the `downloads` namespace with ACL rotated to
/// public-read, content-disposition forced to `attachment`, and the metadata
/// replaced wholesale with the original metadata plus an `original-key`
/// entry for audit. Each call targets a fresh random key, so a caller that
/// times out may safely retry without corrupting prior state.
pub async fn issue_download_url(
    storage: &dyn StorageBackend,
    stored_key: &str,
) -> Result<String, StorageError> {
    let filename = stored_key.rsplit('/').next().unwrap_or(stored_key);
    let download_key = KeyStrategy::prefixed(DOWNLOADS_PREFIX).generate(Some(filename));

    let head = storage.head_object(stored_key).await?;

    let mut metadata = head.metadata;
    metadata.insert(ORIGINAL_KEY_METADATA.to_string(), stored_key.to_string());

    storage
        .copy_object(CopyRequest {
            source_key: stored_key,
            dest_key: &download_key,
            acl: Acl::PublicRead,
            content_type: head.content_type,
            content_disposition: ContentDisposition::Attachment,
            metadata,
        })
        .await?;

    Ok(storage.object_url(&download_key))
}
