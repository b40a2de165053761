use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// A data-model entity owning file fields. The concrete data-model layer
/// (ORM, documents, ...) lives outside this crate; the engine only needs to
/// read stored object keys off named fields.
pub trait FileEntity: Send + Sync {
    /// Stored object key held by `field`; `None` when the field is unknown
    /// or holds no file.
    fn file_field(&self, field: &str) -> Option<&str>;
}

/// Looks up entities by `(app, model, id)` coordinates.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    async fn resolve(&self, app: &str, model: &str, id: &str) -> Option<Arc<dyn FileEntity>>;
}

/// Minimal entity: a bag of field name -> stored key.
#[derive(Debug, Clone, Default)]
pub struct StoredRecord {
    fields: HashMap<String, String>,
}

impl StoredRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, field: impl Into<String>, stored_key: impl Into<String>) -> Self {
        self.fields.insert(field.into(), stored_key.into());
        self
    }
}

impl FileEntity for StoredRecord {
    fn file_field(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}

/// In-memory entity store for deployments without a data-model layer and for
/// tests.
#[derive(Default)]
pub struct MemoryEntityResolver {
    records: HashMap<(String, String, String), Arc<StoredRecord>>,
}

impl MemoryEntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, app: &str, model: &str, id: &str, record: StoredRecord) {
        self.records.insert(
            (app.to_string(), model.to_string(), id.to_string()),
            Arc::new(record),
        );
    }
}

#[async_trait]
impl EntityResolver for MemoryEntityResolver {
    async fn resolve(&self, app: &str, model: &str, id: &str) -> Option<Arc<dyn FileEntity>> {
        self.records
            .get(&(app.to_string(), model.to_string(), id.to_string()))
            .map(|record| Arc::clone(record) as Arc<dyn FileEntity>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_record() {
        let mut resolver = MemoryEntityResolver::new();
        resolver.insert(
            "docs",
            "report",
            "1",
            StoredRecord::new().with_file("file", "files/abc/test.txt"),
        );

        let entity = resolver.resolve("docs", "report", "1").await.unwrap();
        assert_eq!(entity.file_field("file"), Some("files/abc/test.txt"));
        assert_eq!(entity.file_field("image"), None);
    }

    #[tokio::test]
    async fn test_resolve_unknown_record() {
        let resolver = MemoryEntityResolver::new();
        assert!(resolver.resolve("docs", "report", "404").await.is_none());
    }

    #[test]
    fn test_empty_field_reads_as_absent() {
        let record = StoredRecord::new().with_file("file", "");
        assert_eq!(record.file_field("file"), None);
    }
}
