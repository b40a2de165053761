use std::collections::BTreeMap;

use crate::services::profiles::{Principal, UploadProfile};

/// Request-scoped description of an intended upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub profile_name: String,
    pub filename: String,
    pub content_type: String,
    pub content_length: u64,
}

/// Field name -> human-readable error messages, ordered for deterministic
/// serialization.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// Validate an upload request against its profile.
///
/// Checks do not short-circuit: every violated constraint (authorization,
/// content type, content length) lands in the aggregated error map so a
/// client sees all problems in one round trip.
pub fn validate_upload(
    profile: &UploadProfile,
    request: &UploadRequest,
    principal: Option<&Principal>,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Some(auth) = &profile.auth {
        if !auth(principal) {
            errors
                .entry("config")
                .or_default()
                .push("Current user can't use this destination".to_string());
        }
    }

    if let Some(allowed) = &profile.allowed_content_types {
        if !allowed.contains(&request.content_type) {
            let expected = allowed.join(", ");
            errors.entry("content_type").or_default().push(format!(
                "Invalid file type - `{}` of `{}`. Expected: {}.",
                request.content_type, request.filename, expected,
            ));
        }
    }

    if let Some((min_bound, max_bound)) = profile.content_length_range {
        // Bounds are inclusive: sizes exactly equal to min or max are valid.
        if request.content_length < min_bound || request.content_length > max_bound {
            errors.entry("content_length").or_default().push(format!(
                "Invalid file size - {} of {}. Need between {} and {}.",
                natural_size(request.content_length),
                request.filename,
                natural_size(min_bound),
                natural_size(max_bound),
            ));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Render a byte count in decimal units the way humans read file sizes,
/// e.g. `5.0 kB` or `20.0 MB`.
pub fn natural_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1000 {
        return format!("{bytes} Bytes");
    }

    let mut value = bytes as f64;
    for suffix in SUFFIXES {
        value /= 1000.0;
        if value < 1000.0 {
            return format!("{value:.1} {suffix}");
        }
    }
    format!("{value:.1} YB")
}
