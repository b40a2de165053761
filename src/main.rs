use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use s3_direct_backend::config::StorageConfig;
use s3_direct_backend::infrastructure::storage;
use s3_direct_backend::services::entities::MemoryEntityResolver;
use s3_direct_backend::services::keys::KeyStrategy;
use s3_direct_backend::services::permissions::{IsAuthenticated, PermissionResolver};
use s3_direct_backend::services::profiles::{Acl, ProfileRegistry, UploadProfile};
use s3_direct_backend::{AppState, create_app};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Register the upload destinations this deployment serves.
///
/// Registration happens once, before request traffic; a duplicate name is a
/// configuration bug and aborts startup.
fn register_profiles(profiles: &ProfileRegistry) -> anyhow::Result<()> {
    profiles.register(
        UploadProfile::new("files", KeyStrategy::randomized("files"))
            .allowed_content_types(["text/plain", "application/pdf"])
            .content_length_range(5_000, 20_000_000)
            .auth(|principal| principal.is_some()),
    )?;

    profiles.register(
        UploadProfile::new("documents", KeyStrategy::prefixed("documents"))
            .acl(Acl::Private)
            .auth(|principal| principal.is_some()),
    )?;

    profiles.register(UploadProfile::new(
        "anon-files",
        KeyStrategy::randomized("anon-files"),
    ))?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_direct_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting S3 Direct Backend...");

    let config = StorageConfig::from_env();
    let storage_backend = storage::setup_storage(&config).await;

    let profiles = Arc::new(ProfileRegistry::new());
    register_profiles(&profiles)?;

    let permissions =
        Arc::new(PermissionResolver::new().default_permission(Arc::new(IsAuthenticated)));

    // Plug the data-model layer here; the in-memory resolver serves
    // standalone deployments.
    let entities = Arc::new(MemoryEntityResolver::new());

    let state = AppState {
        profiles,
        storage: storage_backend,
        entities,
        permissions,
        config,
    };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
