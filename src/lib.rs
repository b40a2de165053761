pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::StorageConfig;
use crate::services::entities::EntityResolver;
use crate::services::permissions::PermissionResolver;
use crate::services::profiles::ProfileRegistry;
use crate::services::storage::StorageBackend;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::uploads::get_upload_params,
        api::handlers::downloads::check_file_access,
        api::handlers::downloads::get_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::uploads::UploadParamsRequest,
            api::handlers::uploads::UploadParamsResponse,
            api::handlers::downloads::DownloadLinkResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "s3", description = "Direct upload and download brokering endpoints"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileRegistry>,
    pub storage: Arc<dyn StorageBackend>,
    pub entities: Arc<dyn EntityResolver>,
    pub permissions: Arc<PermissionResolver>,
    pub config: StorageConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/s3/get-params", post(api::handlers::uploads::get_upload_params))
        .route(
            "/s3/check-file-access/:app/:model/:id/:field",
            get(api::handlers::downloads::check_file_access),
        )
        .route(
            "/s3/get-file/:app/:model/:id/:field",
            get(api::handlers::downloads::get_file),
        )
        .layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::principal_middleware,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
