use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::services::entities::FileEntity;
use crate::services::profiles::Principal;

/// Finer-grained permission interface for implementations that decide per
/// field rather than per object.
pub trait FieldPermissionCheck: Send + Sync {
    fn has_field_permission(
        &self,
        principal: Option<&Principal>,
        entity: &dyn FileEntity,
        field: &str,
    ) -> bool;
}

/// Read-time access decision for a file-owning entity.
pub trait PermissionCheck: Send + Sync {
    fn has_object_permission(&self, principal: Option<&Principal>, entity: &dyn FileEntity)
    -> bool;

    /// Capability query: implementations that support per-field decisions
    /// return their field-level interface here; dispatch prefers it over the
    /// object-level check.
    fn field_check(&self) -> Option<&dyn FieldPermissionCheck> {
        None
    }
}

/// Grants access to anyone, including anonymous requests.
pub struct AllowAny;

impl PermissionCheck for AllowAny {
    fn has_object_permission(
        &self,
        _principal: Option<&Principal>,
        _entity: &dyn FileEntity,
    ) -> bool {
        true
    }
}

/// Grants access to any authenticated principal.
pub struct IsAuthenticated;

impl PermissionCheck for IsAuthenticated {
    fn has_object_permission(
        &self,
        principal: Option<&Principal>,
        _entity: &dyn FileEntity,
    ) -> bool {
        principal.is_some()
    }
}

/// A field was requested for which neither a mapping entry nor a default
/// permission exists. This is fatal misconfiguration, not a client error.
#[derive(Error, Debug)]
#[error(
    "no file permission configured for `{0}`; set a permission mapping or a default permission"
)]
pub struct MisconfiguredPermission(pub String);

/// Maps `app.model.field` paths to permission implementations, with an
/// optional global default.
#[derive(Default)]
pub struct PermissionResolver {
    mapping: HashMap<String, Arc<dyn PermissionCheck>>,
    default_permission: Option<Arc<dyn PermissionCheck>>,
}

impl PermissionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(mut self, path: impl Into<String>, check: Arc<dyn PermissionCheck>) -> Self {
        self.mapping.insert(path.into(), check);
        self
    }

    pub fn default_permission(mut self, check: Arc<dyn PermissionCheck>) -> Self {
        self.default_permission = Some(check);
        self
    }

    fn resolve(
        &self,
        app: &str,
        model: &str,
        field: &str,
    ) -> Result<Arc<dyn PermissionCheck>, MisconfiguredPermission> {
        let path = format!("{app}.{model}.{field}");
        self.mapping
            .get(&path)
            .or(self.default_permission.as_ref())
            .cloned()
            .ok_or(MisconfiguredPermission(path))
    }

    /// Decide whether `principal` may read `field` of the given entity,
    /// preferring the field-level check when the resolved permission
    /// supports it.
    pub fn check_access(
        &self,
        app: &str,
        model: &str,
        field: &str,
        principal: Option<&Principal>,
        entity: &dyn FileEntity,
    ) -> Result<bool, MisconfiguredPermission> {
        let permission = self.resolve(app, model, field)?;
        Ok(match permission.field_check() {
            Some(field_check) => field_check.has_field_permission(principal, entity, field),
            None => permission.has_object_permission(principal, entity),
        })
    }
}
