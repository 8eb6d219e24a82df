use std::io;
use std::path::{Path, PathBuf};

use bv_domain::InvalidVersion;

/// Errors surfaced by the artifact store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("[BV100] {0}")]
    InvalidVersion(#[from] InvalidVersion),
    #[error("[BV101] invalid changelog version '{0}' (expected v followed by digits and dots)")]
    InvalidChangelogVersion(String),
    #[error("[BV200] version {version} not found")]
    NotFound { version: String },
    #[error("[BV201] changelog for {version} not found")]
    ChangelogNotFound { version: String },
    #[error("[BV300] {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("[BV301] failed to encode metadata: {0}")]
    Encode(String),
    #[error("[BV310] metadata document {} is corrupt: {reason}", .path.display())]
    CorruptMetadata { path: PathBuf, reason: String },
    #[error("[BV320] artifact {version} digest mismatch (expected {expected}, found {actual})")]
    DigestMismatch {
        version: String,
        expected: String,
        actual: String,
    },
}

impl StoreError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidVersion(_) => "BV100",
            Self::InvalidChangelogVersion(_) => "BV101",
            Self::NotFound { .. } => "BV200",
            Self::ChangelogNotFound { .. } => "BV201",
            Self::Io { .. } => "BV300",
            Self::Encode(_) => "BV301",
            Self::CorruptMetadata { .. } => "BV310",
            Self::DigestMismatch { .. } => "BV320",
        }
    }

    /// Errors caused by the caller's input rather than the store's state.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidVersion(_)
                | Self::InvalidChangelogVersion(_)
                | Self::NotFound { .. }
                | Self::ChangelogNotFound { .. }
        )
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ChangelogNotFound { .. })
    }

    pub(crate) fn not_found(version: &str) -> Self {
        Self::NotFound {
            version: version.to_string(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Attach a path-bearing description to raw I/O failures.
pub(crate) trait IoContext<T> {
    fn io_context<F>(self, describe: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F>(self, describe: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| StoreError::io(describe(), source))
    }
}

pub(crate) fn describe(action: &str, path: &Path) -> String {
    format!("failed to {action} {}", path.display())
}
