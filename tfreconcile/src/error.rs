//! Error types for tfreconcile
//!
//! Two layers: [`ApiError`] is what a vendor API client hands back, carrying an
//! explicit [`ErrorKind`] so reconcilers can match on "not found" without
//! inspecting concrete error types. [`ReconcileError`] is what every reconciler
//! returns to the caller.

use crate::resource::ResourceInstance;
use crate::types::Diagnostics;
use std::fmt;
use std::time::Duration;

/// Classification of a failed API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, TLS, timeout or IO failure before a response was received
    Transport,
    /// 401/403 - credentials rejected
    Auth,
    /// The addressed object does not exist
    NotFound,
    /// The object is in a state that conflicts with the request
    Conflict,
    /// Any other non-success response
    Api,
    /// A response arrived but could not be decoded
    Decode,
    /// The resource does not implement the requested capability
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport error",
            ErrorKind::Auth => "authentication failed",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Api => "API error",
            ErrorKind::Decode => "decode error",
            ErrorKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Error returned by the vendor API client boundary
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    status: Option<u16>,
    code: Option<String>,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    /// Wraps a lower-level failure that happened before any response
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: ErrorKind::Transport,
            status: None,
            code: None,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn decode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: ErrorKind::Decode,
            status: None,
            code: None,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Classifies a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => ErrorKind::Auth,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            _ => ErrorKind::Api,
        };
        Self {
            kind,
            status: Some(status),
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the vendor-specific error code (e.g. `AS.2007`)
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Overrides the classification, for APIs that report absence with a
    /// non-404 status and a dedicated error code
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for API client calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error type for reconciler operations
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid configuration: {0}")]
    Validation(Diagnostics),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(
        "timeout after {timeout:?} while waiting for target state (last state: {})",
        .last_state.as_deref().unwrap_or("none")
    )]
    PollTimeout {
        timeout: Duration,
        last_state: Option<String>,
    },

    #[error(
        "cancelled while waiting for target state (last state: {})",
        .last_state.as_deref().unwrap_or("none")
    )]
    Cancelled { last_state: Option<String> },

    #[error(
        "resource entered failure state '{state}'{}",
        .detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default()
    )]
    PollFailed {
        state: String,
        detail: Option<String>,
    },

    #[error("unexpected state '{state}', wanted one of: {}", .expected.join(", "))]
    UnexpectedState { state: String, expected: Vec<String> },

    #[error("{resource} disappeared while waiting for it ({checks} consecutive not-found observations)")]
    Vanished { resource: String, checks: u32 },

    #[error("invalid poll target: {0}")]
    InvalidPollTarget(String),

    #[error("change requires replacement of the resource: {}", .0.join(", "))]
    ReplaceRequired(Vec<String>),

    #[error("invalid import ID '{id}': expected format {format}")]
    InvalidImportId { id: String, format: String },

    #[error("cannot import non-existent remote object {type_name} '{id}'")]
    ImportNotFound { type_name: String, id: String },

    #[error("invalid schema for {type_name}: {message}")]
    Schema { type_name: String, message: String },

    #[error("unknown resource or data source type: {0}")]
    UnknownResource(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("type mismatch for '{attribute}': expected {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// The remote object exists and its identifier was recorded, but a step after
    /// creation failed
    #[error("{} '{}' was created but is tainted: {source}", .instance.type_name, .instance.id)]
    Tainted {
        instance: Box<ResourceInstance>,
        #[source]
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    pub fn tainted(instance: ResourceInstance, source: ReconcileError) -> Self {
        ReconcileError::Tainted {
            instance: Box::new(instance),
            source: Box::new(source),
        }
    }

    /// Poll deadline exceeded or the context was cancelled
    pub fn is_timeout(&self) -> bool {
        match self {
            ReconcileError::PollTimeout { .. } | ReconcileError::Cancelled { .. } => true,
            ReconcileError::Tainted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::Api(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Identifier recorded before the failure, if the remote object exists
    pub fn recorded_instance(&self) -> Option<&ResourceInstance> {
        match self {
            ReconcileError::Tainted { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, ReconcileError>;
