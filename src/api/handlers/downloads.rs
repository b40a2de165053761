use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::AppError;
use crate::api::middleware::auth::CurrentPrincipal;
use crate::services::download::issue_download_url;
use crate::services::profiles::Principal;

#[derive(Serialize, ToSchema)]
pub struct DownloadLinkResponse {
    pub url: String,
}

/// Resolve the stored key behind `(app, model, id, field)` for the given
/// principal. Missing entity, missing field and denied access are all the
/// same `NotFound` to the caller.
async fn resolve_file_field(
    state: &crate::AppState,
    principal: Option<&Principal>,
    app: &str,
    model: &str,
    id: &str,
    field: &str,
) -> Result<String, AppError> {
    let entity = state
        .entities
        .resolve(app, model, id)
        .await
        .ok_or(AppError::NotFound)?;

    if !state
        .permissions
        .check_access(app, model, field, principal, entity.as_ref())?
    {
        return Err(AppError::NotFound);
    }

    let stored_key = entity.file_field(field).ok_or(AppError::NotFound)?;
    Ok(stored_key.to_string())
}

/// Check if the requesting principal has access to a stored file.
#[utoipa::path(
    get,
    path = "/s3/check-file-access/{app}/{model}/{id}/{field}",
    params(
        ("app" = String, Path, description = "Application label"),
        ("model" = String, Path, description = "Model name"),
        ("id" = String, Path, description = "Entity id"),
        ("field" = String, Path, description = "File field name")
    ),
    responses(
        (status = 200, description = "Access granted"),
        (status = 404, description = "Entity or field missing, or access denied")
    ),
    tag = "s3"
)]
pub async fn check_file_access(
    State(state): State<crate::AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path((app, model, id, field)): Path<(String, String, String, String)>,
) -> Result<StatusCode, AppError> {
    resolve_file_field(&state, principal.as_ref(), &app, &model, &id, &field).await?;
    Ok(StatusCode::OK)
}

/// Get a download link for a stored file.
///
/// The link points at a freshly minted public copy with content-disposition
/// forced to attachment; the original object stays hidden.
#[utoipa::path(
    get,
    path = "/s3/get-file/{app}/{model}/{id}/{field}",
    params(
        ("app" = String, Path, description = "Application label"),
        ("model" = String, Path, description = "Model name"),
        ("id" = String, Path, description = "Entity id"),
        ("field" = String, Path, description = "File field name")
    ),
    responses(
        (status = 200, description = "Download link", body = DownloadLinkResponse),
        (status = 404, description = "Entity or field missing, or access denied")
    ),
    tag = "s3"
)]
pub async fn get_file(
    State(state): State<crate::AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path((app, model, id, field)): Path<(String, String, String, String)>,
) -> Result<Json<DownloadLinkResponse>, AppError> {
    let stored_key =
        resolve_file_field(&state, principal.as_ref(), &app, &model, &id, &field).await?;

    let url = issue_download_url(state.storage.as_ref(), &stored_key).await?;

    Ok(Json(DownloadLinkResponse { url }))
}
