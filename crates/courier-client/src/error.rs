//! Client error types.

use std::fmt;

use courier_protocol::ProtocolError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Connection to the command service or broker failed.
    Connection(String),
    /// Protocol/framing error.
    Protocol(String),
    /// Well-formed reply whose status indicates rejection.
    Rejected(String),
    /// Empty local input, rejected before any network call.
    EmptyInput(&'static str),
    /// Operation requires a logged-in session.
    NotLoggedIn,
    /// The session already has an identity.
    AlreadyLoggedIn(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Rejected(msg) => write!(f, "{}", msg),
            Self::EmptyInput(field) => write!(f, "{} must not be empty", field),
            Self::NotLoggedIn => write!(f, "log in first"),
            Self::AlreadyLoggedIn(user) => write!(f, "already logged in as {}", user),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(err) => Self::Io(err),
            other => Self::Protocol(other.to_string()),
        }
    }
}
