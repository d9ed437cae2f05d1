//! simple-graph-engine: Action dispatch and permission escalation
//!
//! This crate turns high-level intents ("publish this story", "fetch these
//! friends") into permission-checked, session-aware graph calls:
//!
//! - [`SessionManager`] owns the session and serializes its transitions
//! - [`Action`] describes one operation and shapes its request
//! - [`Dispatcher`] escalates missing permissions, runs the request and
//!   delivers the typed result through a [`Completion`]
//!
//! Transport, login flow and dialog rendering are collaborators supplied
//! through the [`GraphTransport`], [`SessionProvider`] and
//! [`DialogProvider`] traits.

pub mod action;
pub mod audit;
pub mod config;
pub mod dialog;
pub mod dispatcher;
pub mod error;
pub mod permission;
pub mod provider;
pub mod session;
pub mod transport;

pub use action::{
    validate_request_id, Action, ActionOutput, FromOutput, InviteOutcome, PublishOutcome,
};
pub use audit::{
    AuditError, AuditEvent, AuditEventType, AuditSink, CompositeAuditSink, FileAuditSink,
    MemoryAuditSink, NullAuditSink,
};
pub use config::{ConfigError, GraphConfig, GraphConfigBuilder, TransitionPolicy};
pub use dialog::{
    DialogKind, DialogProvider, DialogRequest, DialogResponse, InviteRequest,
    ScriptedDialogProvider, UnavailableDialogProvider,
};
pub use dispatcher::{Completion, Dispatcher, HostContext};
pub use error::{ActionError, ActionResult, AuthError, AuthResult, DialogError, TransportError};
pub use permission::{
    DefaultEscalationPolicy, EscalationContext, EscalationDecision, EscalationPolicy,
    NeverEscalatePolicy, RepromptEscalationPolicy,
};
pub use provider::{
    AccessToken, OpenedSession, ProviderBehavior, ProviderCall, ScriptedSessionProvider,
    SessionProvider,
};
pub use session::{
    PermissionsGranted, SessionClosed, SessionManager, SessionOpened, SessionPhase, SessionState,
};
pub use transport::{GraphRequest, GraphResponse, GraphTransport, HttpMethod, RecordingTransport};

/// Lock a std mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
