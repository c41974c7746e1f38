use doctree_core::ProviderError;
use thiserror::Error;

use crate::path::CanonicalPath;

/// Why an adapter operation did not go through.
///
/// Only used internally and in logs: the public surface reports every one
/// of these as `false` or `None`.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Path not found: {0}")]
    NotFound(CanonicalPath),

    #[error("Path already exists: {0}")]
    AlreadyExists(CanonicalPath),

    #[error("Permission denied: {0}")]
    PermissionDenied(CanonicalPath),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Provider declined {op} on {path}")]
    Declined {
        op: &'static str,
        path: CanonicalPath,
    },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Failures of the storage runtime itself, as opposed to refusals the
    /// adapter derives from resolution and capability checks.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, FsError::Provider(_) | FsError::Io(_))
    }
}
