//! Error types for memos-relay.

/// Top-level error type for the relay.
///
/// Per-recipient delivery failures never reach this type; they are counted
/// in `DeliveryResult` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel task {channel} did not complete: {reason}")]
    Dispatch { channel: String, reason: String },
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_names_channel() {
        let err = Error::Dispatch {
            channel: "bark".into(),
            reason: "task panicked".into(),
        };
        assert_eq!(
            err.to_string(),
            "Channel task bark did not complete: task panicked"
        );
    }

    #[test]
    fn config_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert_eq!(err.to_string(), "IO error: denied");
    }
}
