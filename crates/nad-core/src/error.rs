//! Error taxonomy shared by every front-end.
//!
//! Each variant maps to one tag (see [`NadError::tag`]) that the CLI and the
//! MCP server print alongside the human-readable message.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NadError {
    /// A value outside its documented domain (volume > max, unknown source, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Dial, DNS, or handshake failure.
    #[error("connect to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// Mid-session I/O failure that survived one reconnect-and-retry.
    #[error("communication with {endpoint} failed: {reason}")]
    CommunicationFailed { endpoint: String, reason: String },

    #[error("malformed response: {0:?}")]
    MalformedResponse(String),

    /// A response named an attribute this codec does not know.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// A numeric payload outside the attribute's domain.
    #[error("{attribute} value out of range: {value}")]
    OutOfRange { attribute: String, value: String },

    #[error("not connected to a device")]
    NotConnected,

    #[error("discovery cache: {0}")]
    CacheIo(String),

    #[error("cancelled after {0:?}")]
    Cancelled(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NadError {
    /// Taxonomy name surfaced by the CLI and MCP adapters.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::ConnectFailed { .. } => "ConnectFailed",
            Self::CommunicationFailed { .. } => "CommunicationFailed",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::UnknownAttribute(_) => "UnknownAttribute",
            Self::OutOfRange { .. } => "OutOfRange",
            Self::NotConnected => "NotConnected",
            Self::CacheIo(_) => "CacheIO",
            Self::Cancelled(_) => "Cancelled",
            Self::Io(_) => "CommunicationFailed",
            Self::Json(_) => "MalformedResponse",
        }
    }

    /// True for errors caused by the socket rather than by the request itself.
    /// The device client reconnects and retries once on these.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_) | Self::CommunicationFailed { .. })
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn out_of_range(attribute: impl Into<String>, value: impl ToString) -> Self {
        Self::OutOfRange {
            attribute: attribute.into(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_taxonomy() {
        assert_eq!(NadError::invalid("x").tag(), "InvalidArgument");
        assert_eq!(NadError::NotConnected.tag(), "NotConnected");
        assert_eq!(NadError::CacheIo("x".into()).tag(), "CacheIO");
        assert_eq!(
            NadError::Cancelled(Duration::from_secs(1)).tag(),
            "Cancelled"
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(NadError::from(io).tag(), "CommunicationFailed");
    }

    #[test]
    fn display_includes_context() {
        let e = NadError::ConnectFailed {
            endpoint: "10.0.0.5:30001".into(),
            reason: "timed out".into(),
        };
        assert_eq!(e.to_string(), "connect to 10.0.0.5:30001 failed: timed out");

        let e = NadError::out_of_range("Brightness", 7);
        assert_eq!(e.to_string(), "Brightness value out of range: 7");
    }

    #[test]
    fn only_socket_errors_are_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(NadError::from(io).is_transport());
        assert!(!NadError::MalformedResponse("x".into()).is_transport());
        assert!(!NadError::NotConnected.is_transport());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NadError>();
    }
}
