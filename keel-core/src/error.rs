use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::convert::ConvertError;
use crate::schema::TypeError;
use crate::value::AccessError;

/// Vendor error codes that indicate a transient condition
pub const RETRYABLE_ERROR_CODES: &[&str] = &[
    "Throttling",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalError",
    "OperationDenied.ResourceLocked",
    "IncorrectStatus",
];

/// Lifecycle phase named in user-facing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Creating,
    Reading,
    Updating,
    Deleting,
    Importing,
    ReadingDataSource,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Creating => "creating",
            Phase::Reading => "reading",
            Phase::Updating => "updating",
            Phase::Deleting => "deleting",
            Phase::Importing => "importing",
            Phase::ReadingDataSource => "reading data source",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{resource_type} {id} not found")]
    NotFound { resource_type: String, id: String },

    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<TypeError>),

    #[error("attribute '{attribute}' cannot change without replacing the resource")]
    ForceNew { attribute: String },

    #[error("{action} failed{}: {message}", code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Transport {
        action: String,
        code: Option<String>,
        message: String,
    },

    #[error("{id} reached failure state '{status}'")]
    State { id: String, status: String },

    #[error("{id} reached unexpected state '{status}', expected one of: {}", expected.join(", "))]
    UnexpectedState {
        id: String,
        status: String,
        expected: Vec<String>,
    },

    #[error("{operation} timed out after {timeout:?}")]
    TimedOut {
        operation: String,
        timeout: Duration,
    },

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Failure raised by a resource service before or around a call
    #[error("{0}")]
    Service(String),

    #[error("error on {phase} {resource_type} {id}: {source}")]
    Resource {
        phase: Phase,
        resource_type: String,
        id: String,
        source: Box<ReconcileError>,
    },
}

fn join_errors(errors: &[TypeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReconcileError {
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn transport(
        action: impl Into<String>,
        code: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            action: action.into(),
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Prepend lifecycle phase and resource identity
    pub fn with_resource(
        self,
        phase: Phase,
        resource_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self::Resource {
            phase,
            resource_type: resource_type.into(),
            id: id.into(),
            source: Box::new(self),
        }
    }

    /// The resource does not exist remotely. Vendor codes such as
    /// `InvalidListener.NotFound` count as well.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport { code: Some(code), .. } => code.contains("NotFound"),
            Self::Resource { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Transient transport failure worth retrying inside a `call_error` hook
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { code: Some(code), .. } => {
                RETRYABLE_ERROR_CODES.iter().any(|c| code == c)
            }
            Self::Resource { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::TimedOut { .. } => true,
            Self::Resource { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
