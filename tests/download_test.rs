mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{MockStorage, app_state, bearer_token};
use http_body_util::BodyExt;
use s3_direct_backend::create_app;
use s3_direct_backend::services::entities::{FileEntity, MemoryEntityResolver, StoredRecord};
use s3_direct_backend::services::permissions::{
    FieldPermissionCheck, IsAuthenticated, PermissionCheck, PermissionResolver,
};
use s3_direct_backend::services::profiles::Principal;
use serde_json::Value;
use tower::ServiceExt;

const SOURCE_KEY: &str = "files/9841422d/test.txt";

fn seeded_storage() -> Arc<MockStorage> {
    let storage = Arc::new(MockStorage::new());
    storage.put_object(
        SOURCE_KEY,
        "text/plain",
        &[("user-id", "42"), ("config-name", "files")],
    );
    storage
}

fn seeded_entities() -> Arc<MemoryEntityResolver> {
    let mut entities = MemoryEntityResolver::new();
    entities.insert(
        "docs",
        "report",
        "1",
        StoredRecord::new()
            .with_file("file", SOURCE_KEY)
            .with_file("image", SOURCE_KEY)
            .with_file("orphan", "files/gone/missing.txt"),
    );
    Arc::new(entities)
}

fn default_permissions() -> Arc<PermissionResolver> {
    Arc::new(PermissionResolver::new().default_permission(Arc::new(IsAuthenticated)))
}

async fn get(app: &axum::Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", token);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_get_file_issues_copy_on_read_url() {
    let storage = seeded_storage();
    let app = create_app(app_state(
        Arc::clone(&storage),
        seeded_entities(),
        default_permissions(),
    ));
    let token = bearer_token("user_1");

    let (status, body) = get(&app, "/s3/get-file/docs/report/1/file", Some(&token)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let url = body["url"].as_str().unwrap();
    assert!(
        url.starts_with("http://127.0.0.1:9000/test-bucket/downloads/"),
        "{url}"
    );
    assert!(url.ends_with("/test.txt"), "{url}");

    let copies = storage.recorded_copies();
    assert_eq!(copies.len(), 1);
    let copy = &copies[0];
    assert_eq!(copy.source_key, SOURCE_KEY);
    assert!(copy.dest_key.starts_with("downloads/"), "{}", copy.dest_key);
    assert!(copy.dest_key.ends_with("/test.txt"), "{}", copy.dest_key);
    assert_eq!(copy.acl, "public-read");
    assert_eq!(copy.content_type, "text/plain");
    // Disposition is forced regardless of how the source was stored.
    assert_eq!(copy.content_disposition, "attachment");
    // Original metadata is carried forward, plus the audit entry.
    assert_eq!(copy.metadata["user-id"], "42");
    assert_eq!(copy.metadata["config-name"], "files");
    assert_eq!(copy.metadata["original-key"], SOURCE_KEY);
}

#[tokio::test]
async fn test_each_download_mints_a_fresh_key() {
    let storage = seeded_storage();
    let app = create_app(app_state(
        Arc::clone(&storage),
        seeded_entities(),
        default_permissions(),
    ));
    let token = bearer_token("user_1");

    let (_, first) = get(&app, "/s3/get-file/docs/report/1/file", Some(&token)).await;
    let (_, second) = get(&app, "/s3/get-file/docs/report/1/file", Some(&token)).await;
    assert_ne!(first["url"], second["url"]);
}

#[tokio::test]
async fn test_anon_is_denied_with_not_found() {
    let app = create_app(app_state(
        seeded_storage(),
        seeded_entities(),
        default_permissions(),
    ));

    let (status, body) = get(&app, "/s3/get-file/docs/report/1/file", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, _) = get(&app, "/s3/check-file-access/docs/report/1/file", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_check_file_access_grants_empty_ok() {
    let app = create_app(app_state(
        seeded_storage(),
        seeded_entities(),
        default_permissions(),
    ));
    let token = bearer_token("user_1");

    let (status, body) = get(&app, "/s3/check-file-access/docs/report/1/file", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_missing_entity_and_missing_field_are_not_found() {
    let app = create_app(app_state(
        seeded_storage(),
        seeded_entities(),
        default_permissions(),
    ));
    let token = bearer_token("user_1");

    let (status, _) = get(&app, "/s3/get-file/docs/report/404/file", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/s3/get-file/docs/report/1/unknown_field", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_backend_object_is_not_found() {
    let app = create_app(app_state(
        seeded_storage(),
        seeded_entities(),
        default_permissions(),
    ));
    let token = bearer_token("user_1");

    // The entity field is set but the backend object is gone.
    let (status, body) = get(&app, "/s3/get-file/docs/report/1/orphan", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

/// Grants a single named field to any principal, nothing at the object level.
struct SpecialFieldOnly(&'static str);

impl PermissionCheck for SpecialFieldOnly {
    fn has_object_permission(
        &self,
        _principal: Option<&Principal>,
        _entity: &dyn FileEntity,
    ) -> bool {
        false
    }

    fn field_check(&self) -> Option<&dyn FieldPermissionCheck> {
        Some(self)
    }
}

impl FieldPermissionCheck for SpecialFieldOnly {
    fn has_field_permission(
        &self,
        principal: Option<&Principal>,
        _entity: &dyn FileEntity,
        field: &str,
    ) -> bool {
        principal.is_some() && field == self.0
    }
}

#[tokio::test]
async fn test_field_level_permission_is_preferred() {
    let permissions = Arc::new(
        PermissionResolver::new()
            .permission("docs.report.image", Arc::new(SpecialFieldOnly("image")))
            .default_permission(Arc::new(IsAuthenticated)),
    );
    let app = create_app(app_state(seeded_storage(), seeded_entities(), permissions));
    let token = bearer_token("user_1");

    let (status, _) = get(&app, "/s3/get-file/docs/report/1/image", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/s3/get-file/docs/report/1/image", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_permission_mapping_is_server_error() {
    // Neither a field mapping nor a default permission is configured.
    let permissions = Arc::new(PermissionResolver::new());
    let app = create_app(app_state(seeded_storage(), seeded_entities(), permissions));
    let token = bearer_token("user_1");

    let (status, _) = get(&app, "/s3/get-file/docs/report/1/file", Some(&token)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
