use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

use crate::services::keys::KeyStrategy;

/// The requesting identity, or `None` for anonymous requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Canned access-control levels applied to stored objects.
///
/// https://docs.aws.amazon.com/AmazonS3/latest/userguide/acl-overview.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    Private,
    PublicRead,
    PublicReadWrite,
    AwsExecRead,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
    LogDeliveryWrite,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AwsExecRead => "aws-exec-read",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::BucketOwnerRead => "bucket-owner-read",
            Acl::BucketOwnerFullControl => "bucket-owner-full-control",
            Acl::LogDeliveryWrite => "log-delivery-write",
        }
    }
}

/// Content-Disposition applied to every object created under a profile.
///
/// https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDisposition {
    Attachment,
    Inline,
}

impl ContentDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentDisposition::Attachment => "attachment",
            ContentDisposition::Inline => "inline",
        }
    }
}

/// Authorization predicate evaluated against the requesting principal.
pub type AuthPredicate = Arc<dyn Fn(Option<&Principal>) -> bool + Send + Sync>;

/// Immutable configuration governing one class of uploadable field.
///
/// Profiles are registered once at startup and read-only afterwards.
#[derive(Clone)]
pub struct UploadProfile {
    pub name: String,
    /// Derives the storage key for uploaded files.
    pub key_strategy: KeyStrategy,
    /// Allowed mime types, `None` for all.
    pub allowed_content_types: Option<Vec<String>>,
    /// Checks whether the requesting principal may use this destination.
    pub auth: Option<AuthPredicate>,
    /// Inclusive size bounds for files, in bytes.
    pub content_length_range: Option<(u64, u64)>,
    pub acl: Acl,
    /// In how many seconds the issued upload policy expires.
    pub expires_in: u64,
    pub success_action_status: u16,
    pub content_disposition: Option<ContentDisposition>,
}

impl UploadProfile {
    pub fn new(name: impl Into<String>, key_strategy: KeyStrategy) -> Self {
        Self {
            name: name.into(),
            key_strategy,
            allowed_content_types: None,
            auth: None,
            content_length_range: None,
            acl: Acl::PublicRead,
            expires_in: 3600,
            success_action_status: 201,
            content_disposition: Some(ContentDisposition::Attachment),
        }
    }

    pub fn allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn auth<F>(mut self, predicate: F) -> Self
    where
        F: Fn(Option<&Principal>) -> bool + Send + Sync + 'static,
    {
        self.auth = Some(Arc::new(predicate));
        self
    }

    pub fn content_length_range(mut self, min: u64, max: u64) -> Self {
        self.content_length_range = Some((min, max));
        self
    }

    pub fn acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }

    pub fn expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = seconds;
        self
    }

    pub fn success_action_status(mut self, status: u16) -> Self {
        self.success_action_status = status;
        self
    }

    pub fn content_disposition(mut self, disposition: Option<ContentDisposition>) -> Self {
        self.content_disposition = disposition;
        self
    }
}

impl fmt::Debug for UploadProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProfile")
            .field("name", &self.name)
            .field("key_strategy", &self.key_strategy)
            .field("allowed_content_types", &self.allowed_content_types)
            .field("auth", &self.auth.is_some())
            .field("content_length_range", &self.content_length_range)
            .field("acl", &self.acl)
            .field("expires_in", &self.expires_in)
            .field("success_action_status", &self.success_action_status)
            .field("content_disposition", &self.content_disposition)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum ProfileError {
    /// Registering the same profile name twice is a configuration bug, not a
    /// request error.
    #[error("upload profile `{0}` is already defined")]
    Duplicate(String),

    #[error("unknown upload profile `{0}`")]
    Unknown(String),
}

/// Write-once-per-name store of upload profiles.
///
/// Populated during startup, read-only under request traffic. Registration is
/// an atomic insert-if-absent, so racing registrations of the same name yield
/// exactly one success.
#[derive(Default)]
pub struct ProfileRegistry {
    profiles: DashMap<String, Arc<UploadProfile>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, profile: UploadProfile) -> Result<(), ProfileError> {
        match self.profiles.entry(profile.name.clone()) {
            Entry::Occupied(_) => Err(ProfileError::Duplicate(profile.name)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(profile));
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<UploadProfile>, ProfileError> {
        self.profiles
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> UploadProfile {
        UploadProfile::new(name, KeyStrategy::randomized("files"))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ProfileRegistry::new();
        registry.register(profile("files")).unwrap();

        let found = registry.lookup("files").unwrap();
        assert_eq!(found.name, "files");
        assert_eq!(found.acl, Acl::PublicRead);
        assert_eq!(found.expires_in, 3600);
        assert_eq!(found.success_action_status, 201);
    }

    #[test]
    fn test_lookup_unknown_profile() {
        let registry = ProfileRegistry::new();
        assert!(matches!(
            registry.lookup("missing"),
            Err(ProfileError::Unknown(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = ProfileRegistry::new();
        registry.register(profile("files")).unwrap();
        assert!(matches!(
            registry.register(profile("files")),
            Err(ProfileError::Duplicate(name)) if name == "files"
        ));
    }

    #[test]
    fn test_concurrent_registration_yields_one_success() {
        let registry = Arc::new(ProfileRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.register(profile("racy")).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|registered| *registered)
            .count();
        assert_eq!(successes, 1);
    }

    #[test]
    fn test_auth_predicate_is_evaluated() {
        let profile = profile("private").auth(|principal| principal.is_some());
        let auth = profile.auth.as_ref().unwrap();
        assert!(!auth(None));
        assert!(auth(Some(&Principal::new("user_1"))));
    }
}
