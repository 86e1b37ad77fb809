//! Error handling and custom error types
//!
//! Every stage of the pipeline fails fast with one of these variants. The
//! variant is preserved all the way up to the CLI so it can choose an exit
//! code and message per kind instead of one generic failure.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What went wrong on the wire, so callers can tell "slow" from "rejected".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    /// The service answered 2xx but the body did not match the response schema.
    Decode,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Decode => "decode",
            TransportKind::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error ({kind}): {source}")]
    Transport {
        kind: TransportKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Remote service rejected the request (status {status}): {message}")]
    RemoteRejection { status: u16, message: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read source image {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

/// Fieldless discriminant of [`Error`], for matching and exit-code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Config,
    Auth,
    Transport(TransportKind),
    RemoteRejection,
    EmptyResponse,
    CorruptArtifact,
    Persistence,
    SourceRead,
    Invariant,
}

/// Exit code used when a call completes without producing an image.
pub const NO_IMAGE_EXIT_CODE: i32 = 6;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Config(_) => ErrorKind::Config,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Transport { kind, .. } => ErrorKind::Transport(*kind),
            Error::RemoteRejection { .. } => ErrorKind::RemoteRejection,
            Error::EmptyResponse(_) => ErrorKind::EmptyResponse,
            Error::CorruptArtifact(_) => ErrorKind::CorruptArtifact,
            Error::Persistence { .. } => ErrorKind::Persistence,
            Error::SourceRead { .. } => ErrorKind::SourceRead,
            Error::Invariant(_) => ErrorKind::Invariant,
        }
    }

    /// Process exit code for this failure. Never 0.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Invariant => 1,
            ErrorKind::InvalidInput => 2,
            ErrorKind::Config | ErrorKind::Auth => 3,
            ErrorKind::Transport(_) => 4,
            ErrorKind::RemoteRejection => 5,
            ErrorKind::EmptyResponse => NO_IMAGE_EXIT_CODE,
            ErrorKind::CorruptArtifact => 7,
            ErrorKind::Persistence | ErrorKind::SourceRead => 8,
        }
    }

    /// Whether retrying the identical call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport(_) | ErrorKind::Persistence
        )
    }

    pub fn transport(
        kind: TransportKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            kind,
            source: source.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportKind::Timeout
        } else if e.is_connect() {
            TransportKind::Connect
        } else if e.is_decode() {
            TransportKind::Decode
        } else {
            TransportKind::Other
        };
        Error::transport(kind, e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_family() {
        let io = || std::io::Error::other("boom");
        let cases = vec![
            (Error::InvalidInput("x".into()), 2),
            (Error::Config("x".into()), 3),
            (Error::Auth("x".into()), 3),
            (Error::transport(TransportKind::Timeout, "slow"), 4),
            (
                Error::RemoteRejection {
                    status: 429,
                    message: "quota".into(),
                },
                5,
            ),
            (Error::EmptyResponse("x".into()), 6),
            (Error::CorruptArtifact("x".into()), 7),
            (
                Error::Persistence {
                    path: "a".into(),
                    source: io(),
                },
                8,
            ),
            (Error::Invariant("x".into()), 1),
        ];

        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{}", err);
            assert_ne!(err.exit_code(), 0);
        }
    }

    #[test]
    fn test_transport_kind_is_preserved() {
        let err = Error::transport(TransportKind::Timeout, "deadline elapsed");
        assert_eq!(err.kind(), ErrorKind::Transport(TransportKind::Timeout));
        assert!(err.to_string().contains("timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejection_message_is_verbatim() {
        let err = Error::RemoteRejection {
            status: 400,
            message: "Model gemini-0 is not found".to_string(),
        };
        assert!(err.to_string().contains("Model gemini-0 is not found"));
        assert!(err.to_string().contains("400"));
        assert!(!err.is_retryable());
    }
}
