//! Client error taxonomy.
//!
//! Every failure in the workbench maps onto one of four kinds: bad user input
//! (nothing was sent), transport failure, a malformed backend response, or
//! media that could not be decoded. The controller turns each into exactly one
//! user-visible notice.

use thiserror::Error;

use crate::media::MediaCategory;

/// Coarse classification used to pick the notice level and wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserInput,
    Transport,
    MalformedResponse,
    Decode,
    Config,
    Io,
}

/// Errors produced by the API client, renderers and workflow controller.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("no file selected")]
    NoActiveFile,

    #[error("unsupported file type: {filename}")]
    UnsupportedFile { filename: String },

    #[error("file too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("active file is {active}, not {requested}")]
    CategoryMismatch {
        active: MediaCategory,
        requested: MediaCategory,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: missing or invalid `{field}`")]
    MalformedResponse { field: String },

    #[error("could not decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NoActiveFile
            | ClientError::UnsupportedFile { .. }
            | ClientError::FileTooLarge { .. }
            | ClientError::CategoryMismatch { .. }
            | ClientError::InvalidParameter { .. } => ErrorKind::UserInput,
            ClientError::Transport(_) | ClientError::Status { .. } => ErrorKind::Transport,
            ClientError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ClientError::Decode { .. } => ErrorKind::Decode,
            ClientError::Config(_) => ErrorKind::Config,
            ClientError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether a fallback transport may substitute a fixture for this failure.
    pub fn is_recoverable_by_fixture(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub(crate) fn malformed(field: impl Into<String>) -> Self {
        ClientError::MalformedResponse {
            field: field.into(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
