//! Error taxonomy for session, dialog, transport and action failures
//!
//! Errors are classified once and surfaced once. Nothing here is retried
//! by the engine.

use thiserror::Error;

/// Errors raised by session transitions and the session provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication cancelled by user")]
    Cancelled,

    #[error("Authentication denied: {0}")]
    Denied(String),

    #[error("Session provider transport failure: {0}")]
    Transport(String),

    #[error("Another session transition is in progress")]
    Busy,

    #[error("No open session")]
    NotOpen,
}

impl AuthError {
    /// Whether the user (rather than the system) refused
    pub fn is_user_refusal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Denied(_))
    }
}

/// Errors raised by the platform dialog collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("Dialog unavailable: {0}")]
    Unavailable(String),

    #[error("Dialog cancelled by user")]
    CancelledByUser,

    #[error("Dialog failed to open: {0}")]
    Failed(String),
}

impl DialogError {
    /// Whether a silent publish may stand in for the dialog
    pub fn allows_silent_fallback(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Failed(_))
    }
}

/// Errors raised by the graph transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Server error {code}: {message}")]
    Server { code: i64, message: String },
}

/// Terminal failure of a dispatched action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("You are not logged in")]
    NotLoggedIn,

    #[error("Permission denied: {}", .0.join(", "))]
    PermissionDenied(Vec<String>),

    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument { arg: String, reason: String },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Request rejected by server ({code}): {message}")]
    ServerRejected { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Dialog(#[from] DialogError),
}

impl ActionError {
    pub fn invalid_argument(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg: arg.into(),
            reason: reason.into(),
        }
    }

    pub fn permission_denied<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PermissionDenied(permissions.into_iter().map(Into::into).collect())
    }

    /// Whether the failure was decided without sending a graph request
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::NotLoggedIn | Self::InvalidArgument { .. } | Self::PermissionDenied(_)
        )
    }

    /// Classify a failed permission request for `permissions`
    ///
    /// A closed session is `NotLoggedIn`; any other failure means the
    /// permissions were not obtained.
    pub fn from_permission_request<I, S>(e: AuthError, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match e {
            AuthError::NotOpen => Self::NotLoggedIn,
            _ => Self::permission_denied(permissions),
        }
    }
}

impl From<TransportError> for ActionError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Network(msg) => Self::Network(msg),
            TransportError::Server { code, message } => Self::ServerRejected { code, message },
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

pub type ActionResult<T> = Result<T, ActionError>;
