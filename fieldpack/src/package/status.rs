//! Package lifecycle status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an offline package.
///
/// ```text
/// UpdateAvailable ─┐
///                  ▼
///               Queued → Downloading → Validating → Ready | Incomplete
///                            │             │
///                            └──► Error ◄──┘
///
/// any state → Removing → Removed | Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    #[default]
    Queued,
    Downloading,
    Validating,
    Ready,
    Incomplete,
    Error,
    Removing,
    Removed,
    /// A prepare request hit an existing ready package; the new download
    /// supersedes it once it starts.
    UpdateAvailable,
}

impl PackageStatus {
    /// Wire name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Incomplete => "incomplete",
            Self::Error => "error",
            Self::Removing => "removing",
            Self::Removed => "removed",
            Self::UpdateAvailable => "update_available",
        }
    }

    /// States that carry an error message.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Incomplete)
    }

    /// States in which no pipeline is running.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Incomplete | Self::Error | Self::Removed
        )
    }

    /// States a download pipeline leaves behind if the process dies mid-run.
    pub fn is_download_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Queued | Self::UpdateAvailable | Self::Downloading | Self::Validating
        )
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form_matches_as_str() {
        for status in [
            PackageStatus::Queued,
            PackageStatus::Downloading,
            PackageStatus::Validating,
            PackageStatus::Ready,
            PackageStatus::Incomplete,
            PackageStatus::Error,
            PackageStatus::Removing,
            PackageStatus::Removed,
            PackageStatus::UpdateAvailable,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_failure_states() {
        assert!(PackageStatus::Error.is_failure());
        assert!(PackageStatus::Incomplete.is_failure());
        assert!(!PackageStatus::Ready.is_failure());
        assert!(!PackageStatus::Removed.is_failure());
    }

    #[test]
    fn test_in_flight_states() {
        assert!(PackageStatus::Downloading.is_download_in_flight());
        assert!(PackageStatus::Validating.is_download_in_flight());
        assert!(!PackageStatus::Removing.is_download_in_flight());
        assert!(!PackageStatus::Ready.is_download_in_flight());
    }
}
