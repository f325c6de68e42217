//! Error types for the package controller.

use crate::store::StoreError;

/// Result type for controller operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Errors returned synchronously by controller operations.
///
/// Failures inside a running pipeline are not errors here: they end up as
/// the record's `ERROR` or `INCOMPLETE` status and in the terminal event.
#[derive(Debug)]
pub enum PackageError {
    /// A request parameter is missing or out of range.
    InvalidParameter { field: &'static str, reason: String },

    /// The record could not be durably written, so the operation never
    /// started.
    Persistence(StoreError),

    /// No record exists with this id.
    NotFound(String),

    /// An asset store could not be enumerated, so readiness is unknown.
    InconclusiveSnapshot,
}

impl PackageError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for PackageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParameter { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
            Self::Persistence(e) => write!(f, "failed to persist package record: {}", e),
            Self::NotFound(id) => write!(f, "package not found: {}", id),
            Self::InconclusiveSnapshot => {
                write!(f, "asset stores did not answer, readiness is unknown")
            }
        }
    }
}

impl std::error::Error for PackageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PackageError {
    fn from(e: StoreError) -> Self {
        Self::Persistence(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            PackageError::invalid("package_id", "must not be blank").to_string(),
            "invalid package_id: must not be blank"
        );
        assert_eq!(
            PackageError::NotFound("farm1".into()).to_string(),
            "package not found: farm1"
        );
    }

    #[test]
    fn test_persistence_keeps_source() {
        let err: PackageError = StoreError::Io {
            key: "packages".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        }
        .into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("failed to persist package record"));
    }
}
