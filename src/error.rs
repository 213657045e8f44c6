// Error kinds produced while resolving the current time
use std::time::Duration;

/// Failures of the time resolution path.
///
/// The `Display` text of the terminal kinds is the exact text handed back to
/// the tool caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("Error: Unknown time zone: {0}")]
    UnknownZone(String),

    #[error("NTP request to {host} timed out after {timeout:?}")]
    RemoteTimeout { host: String, timeout: Duration },

    #[error("NTP request to {host} failed: {reason}")]
    RemoteProtocol { host: String, reason: String },

    #[error("Error: Failed to get time - {0}")]
    TimeUnavailable(String),
}

impl TimeError {
    pub fn protocol(host: &str, reason: impl Into<String>) -> Self {
        TimeError::RemoteProtocol {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether another attempt against the time authority may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TimeError::RemoteTimeout { .. } | TimeError::RemoteProtocol { .. }
        )
    }
}
