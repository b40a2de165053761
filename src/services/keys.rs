use uuid::Uuid;

use crate::utils::filename::{SENTINEL_EXTENSION, clean_filename, random_filename};

/// Strategy for deriving storage object keys from client filenames.
///
/// Keys embed a random unique id, so generating a key twice for the same
/// filename never collides and a stored key cannot be guessed back to the
/// original name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    /// `prefix/<random-id>.<lowercased-extension>` — the original filename is
    /// discarded entirely.
    Randomized { prefix: String },
    /// `prefix/<random-id>/<sanitized-filename>` — keeps a human-readable
    /// filename for traceability (e.g. downloads).
    Prefixed { prefix: String },
}

impl KeyStrategy {
    pub fn randomized(prefix: impl Into<String>) -> Self {
        Self::Randomized { prefix: prefix.into() }
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self::Prefixed { prefix: prefix.into() }
    }

    /// Generate a storage key for `filename`.
    ///
    /// A missing or empty filename never blocks an upload: the key falls back
    /// to `prefix/<random-id>.incorrect`.
    pub fn generate(&self, filename: Option<&str>) -> String {
        let filename = filename.filter(|f| !f.is_empty());
        match self {
            Self::Randomized { prefix } => match filename {
                Some(filename) => format!("{prefix}/{}", random_filename(filename)),
                None => format!("{prefix}/{}{SENTINEL_EXTENSION}", Uuid::new_v4()),
            },
            Self::Prefixed { prefix } => match filename.map(clean_filename).filter(|f| !f.is_empty()) {
                Some(cleaned) => format!("{prefix}/{}/{cleaned}", Uuid::new_v4()),
                None => format!("{prefix}/{}{SENTINEL_EXTENSION}", Uuid::new_v4()),
            },
        }
    }
}
