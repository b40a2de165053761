use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Deserialize;
use tracing::warn;

use crate::config::StorageConfig;

/// Resolved storage-backend credentials. All fields absent means "no
/// credentials available"; callers surface a backend error at the point of
/// use, not at resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn is_available(&self) -> bool {
        self.access_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.secret_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

const METADATA_BASE_URL: &str = "http://169.254.169.254";
const METADATA_TIMEOUT: Duration = Duration::from_secs(1);
const METADATA_ATTEMPTS: u32 = 2;

/// Resolves credentials from static configuration first, then from the
/// instance-role metadata endpoint.
pub struct CredentialProvider {
    static_access_key: Option<String>,
    static_secret_key: Option<String>,
    metadata_base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
}

impl CredentialProvider {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            static_access_key: config.access_key.clone(),
            static_secret_key: config.secret_key.clone(),
            metadata_base_url: METADATA_BASE_URL.to_string(),
            http: reqwest::Client::builder()
                .timeout(METADATA_TIMEOUT)
                .build()
                .expect("failed to build metadata HTTP client"),
        }
    }

    /// Point the role lookup at a different metadata endpoint (tests, local
    /// emulators).
    pub fn with_metadata_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.metadata_base_url = base_url.into();
        self
    }

    /// Resolve credentials.
    ///
    /// Statically configured keys win and are used verbatim. Otherwise the
    /// instance-role metadata endpoint is queried with a bounded timeout and
    /// a small fixed retry count; on failure an all-absent [`Credentials`]
    /// value is returned rather than an error.
    pub async fn resolve(&self) -> Credentials {
        let static_credentials = Credentials {
            access_key: self.static_access_key.clone(),
            secret_key: self.static_secret_key.clone(),
            session_token: None,
        };
        if static_credentials.is_available() {
            return static_credentials;
        }

        for attempt in 1..=METADATA_ATTEMPTS {
            match self.fetch_role_credentials().await {
                Ok(credentials) => return credentials,
                Err(e) => {
                    warn!(
                        "instance metadata credential lookup failed (attempt {}/{}): {}",
                        attempt, METADATA_ATTEMPTS, e
                    );
                }
            }
        }

        Credentials::default()
    }

    async fn fetch_role_credentials(&self) -> Result<Credentials> {
        let roles_url = format!(
            "{}/latest/meta-data/iam/security-credentials/",
            self.metadata_base_url
        );
        let roles = self
            .http
            .get(&roles_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let role = roles
            .lines()
            .next()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| anyhow!("no instance role advertised"))?
            .to_string();

        let role_credentials: RoleCredentials = self
            .http
            .get(format!("{roles_url}{role}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Credentials {
            access_key: Some(role_credentials.access_key_id),
            secret_key: Some(role_credentials.secret_access_key),
            session_token: Some(role_credentials.token),
        })
    }
}
