use std::collections::BTreeMap;

use crate::services::profiles::{Principal, UploadProfile};
use crate::services::storage::{PolicyCondition, StorageBackend, StorageError};
use crate::services::validation::UploadRequest;

/// Metadata value recorded for uploads without a principal.
const ANON_PRINCIPAL: &str = "anon";

/// A time-limited, pre-authorized set of parameters for one direct upload.
/// Consumed once by the client; the actual byte transfer happens against the
/// storage backend, not this service.
#[derive(Debug, Clone)]
pub struct GeneratedPolicy {
    pub url: String,
    pub params: BTreeMap<String, String>,
}

/// Forced metadata embedded in every upload so a stored object is traceable
/// back to its authorization context.
pub fn forced_metadata(
    profile: &UploadProfile,
    principal: Option<&Principal>,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "x-amz-meta-user-id".to_string(),
            principal
                .map(|p| p.id.clone())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| ANON_PRINCIPAL.to_string()),
        ),
        ("x-amz-meta-config-name".to_string(), profile.name.clone()),
    ])
}

/// Prepare form fields for the upload policy.
pub fn build_fields(
    profile: &UploadProfile,
    content_type: &str,
    meta_data: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::from([
        (
            "success_action_status".to_string(),
            profile.success_action_status.to_string(),
        ),
        ("acl".to_string(), profile.acl.as_str().to_string()),
        ("Content-Type".to_string(), content_type.to_string()),
    ]);
    fields.extend(meta_data.clone());
    if let Some(disposition) = profile.content_disposition {
        fields.insert(
            "Content-Disposition".to_string(),
            disposition.as_str().to_string(),
        );
    }
    fields
}

/// Prepare policy conditions mirroring the fields, plus the length-range
/// bound so the storage backend itself enforces the size limit even when a
/// client bypasses this service for the actual upload.
pub fn build_conditions(
    profile: &UploadProfile,
    content_type: &str,
    meta_data: &BTreeMap<String, String>,
) -> Vec<PolicyCondition> {
    let mut conditions = vec![
        PolicyCondition::exact_match("acl", profile.acl.as_str()),
        PolicyCondition::exact_match(
            "success_action_status",
            profile.success_action_status.to_string(),
        ),
        PolicyCondition::exact_match("Content-Type", content_type),
    ];
    if let Some((min, max)) = profile.content_length_range {
        conditions.push(PolicyCondition::ContentLengthRange { min, max });
    }
    if let Some(disposition) = profile.content_disposition {
        conditions.push(PolicyCondition::exact_match(
            "Content-Disposition",
            disposition.as_str(),
        ));
    }
    for (key, value) in meta_data {
        conditions.push(PolicyCondition::exact_match(key, value));
    }
    conditions
}

/// Generate params for a direct upload of an already-validated request.
pub async fn generate_upload_params(
    storage: &dyn StorageBackend,
    profile: &UploadProfile,
    request: &UploadRequest,
    principal: Option<&Principal>,
) -> Result<GeneratedPolicy, StorageError> {
    let meta_data = forced_metadata(profile, principal);
    let fields = build_fields(profile, &request.content_type, &meta_data);
    let conditions = build_conditions(profile, &request.content_type, &meta_data);
    let key = profile.key_strategy.generate(Some(&request.filename));

    let presigned = storage
        .generate_presigned_post(&key, &fields, &conditions, profile.expires_in)
        .await?;

    Ok(GeneratedPolicy {
        url: presigned.url,
        params: presigned.fields,
    })
}
