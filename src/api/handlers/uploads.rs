use std::collections::BTreeMap;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::AppError;
use crate::api::middleware::auth::CurrentPrincipal;
use crate::services::policy::generate_upload_params;
use crate::services::validation::{UploadRequest, validate_upload};

#[derive(Deserialize, ToSchema)]
pub struct UploadParamsRequest {
    /// Name of the upload profile governing this destination
    pub config: String,
    pub filename: String,
    pub content_type: String,
    pub content_length: u64,
}

#[derive(Serialize, ToSchema)]
pub struct UploadParamsResponse {
    /// Form target the client uploads to directly
    pub url: String,
    /// Form fields to send along with the file
    pub params: BTreeMap<String, String>,
}

/// Get parameters for a direct upload to the storage bucket.
///
/// Returns everything a client needs for the upload: send the `params` as
/// `form-data` to `url` via POST, with the file as the final `file` field.
/// File bytes never pass through this service.
#[utoipa::path(
    post,
    path = "/s3/get-params",
    request_body = UploadParamsRequest,
    responses(
        (status = 200, description = "Upload policy issued", body = UploadParamsResponse),
        (status = 400, description = "Validation failed, mapping of field to error messages")
    ),
    tag = "s3"
)]
pub async fn get_upload_params(
    State(state): State<crate::AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(req): Json<UploadParamsRequest>,
) -> Result<Json<UploadParamsResponse>, AppError> {
    let profile = state
        .profiles
        .lookup(&req.config)
        .map_err(|_| AppError::UnknownProfile(req.config.clone()))?;

    let request = UploadRequest {
        profile_name: req.config,
        filename: req.filename,
        content_type: req.content_type,
        content_length: req.content_length,
    };

    validate_upload(&profile, &request, principal.as_ref()).map_err(AppError::Validation)?;

    let policy =
        generate_upload_params(state.storage.as_ref(), &profile, &request, principal.as_ref())
            .await?;

    Ok(Json(UploadParamsResponse {
        url: policy.url,
        params: policy.params,
    }))
}
