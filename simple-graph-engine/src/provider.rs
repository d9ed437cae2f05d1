//! Session provider collaborator
//!
//! Opens, extends and closes the authenticated session. Implementations
//! wrap whatever login flow the platform offers; the engine only sees
//! tokens and granted scope strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simple_graph_api::{Permission, PermissionType};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::AuthError;
use crate::lock;

/// Opaque access token with optional expiry
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Non-empty and not expired at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && self.expires_at.map_or(true, |exp| exp > now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a successful `open_session`
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub token: AccessToken,
    /// Scopes granted at login
    pub granted: Vec<String>,
}

/// Session provider contract
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Run the login flow, asking for the given read permissions
    async fn open_session(
        &self,
        read_permissions: &[Permission],
    ) -> Result<OpenedSession, AuthError>;

    /// Ask for more permissions of one class on an open session.
    /// Returns the subset the user granted.
    async fn request_permissions(
        &self,
        token: &AccessToken,
        permissions: &[Permission],
        permission_type: PermissionType,
    ) -> Result<Vec<String>, AuthError>;

    async fn close_session(&self, token: &AccessToken) -> Result<(), AuthError>;
}

// ============================================================================
// Scripted Provider (for testing)
// ============================================================================

/// How the scripted provider answers a login or escalation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderBehavior {
    /// Grant everything asked for
    GrantAll,
    /// Grant only these wire values (intersected with the request)
    GrantOnly(BTreeSet<String>),
    /// User declined every requested permission, without error
    GrantNone,
    /// User cancelled the flow
    Cancel,
    /// Provider refused
    Deny(String),
    /// Provider could not be reached
    Fail(String),
}

impl ProviderBehavior {
    pub fn grant_only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::GrantOnly(values.into_iter().map(Into::into).collect())
    }

    fn answer(&self, requested: &[Permission]) -> Result<Vec<String>, AuthError> {
        match self {
            Self::GrantAll => Ok(requested.iter().map(|p| p.value().to_string()).collect()),
            Self::GrantOnly(allowed) => Ok(requested
                .iter()
                .map(|p| p.value().to_string())
                .filter(|v| allowed.contains(v))
                .collect()),
            Self::GrantNone => Ok(Vec::new()),
            Self::Cancel => Err(AuthError::Cancelled),
            Self::Deny(reason) => Err(AuthError::Denied(reason.clone())),
            Self::Fail(reason) => Err(AuthError::Transport(reason.clone())),
        }
    }
}

/// A call received by [`ScriptedSessionProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Open(Vec<String>),
    Request {
        permissions: Vec<String>,
        permission_type: PermissionType,
    },
    Close,
}

/// Provider that answers from configured behaviors and records calls
#[derive(Debug)]
pub struct ScriptedSessionProvider {
    login: Mutex<ProviderBehavior>,
    escalation: Mutex<ProviderBehavior>,
    logout: Mutex<Result<(), AuthError>>,
    token: AccessToken,
    delay: Option<Duration>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedSessionProvider {
    /// Provider that grants everything
    pub fn granting() -> Self {
        Self {
            login: Mutex::new(ProviderBehavior::GrantAll),
            escalation: Mutex::new(ProviderBehavior::GrantAll),
            logout: Mutex::new(Ok(())),
            token: AccessToken::new("scripted-token"),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_login(self, behavior: ProviderBehavior) -> Self {
        *lock(&self.login) = behavior;
        self
    }

    pub fn with_escalation(self, behavior: ProviderBehavior) -> Self {
        *lock(&self.escalation) = behavior;
        self
    }

    pub fn with_logout(self, result: Result<(), AuthError>) -> Self {
        *lock(&self.logout) = result;
        self
    }

    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = token;
        self
    }

    /// Sleep this long inside every call, simulating user interaction
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the escalation answer mid-test
    pub fn set_escalation(&self, behavior: ProviderBehavior) {
        *lock(&self.escalation) = behavior;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    /// Number of `request_permissions` calls received
    pub fn escalation_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ProviderCall::Request { .. }))
            .count()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SessionProvider for ScriptedSessionProvider {
    async fn open_session(
        &self,
        read_permissions: &[Permission],
    ) -> Result<OpenedSession, AuthError> {
        lock(&self.calls).push(ProviderCall::Open(
            read_permissions.iter().map(|p| p.value().to_string()).collect(),
        ));
        self.pause().await;

        let behavior = lock(&self.login).clone();
        let granted = behavior.answer(read_permissions)?;
        Ok(OpenedSession {
            token: self.token.clone(),
            granted,
        })
    }

    async fn request_permissions(
        &self,
        _token: &AccessToken,
        permissions: &[Permission],
        permission_type: PermissionType,
    ) -> Result<Vec<String>, AuthError> {
        lock(&self.calls).push(ProviderCall::Request {
            permissions: permissions.iter().map(|p| p.value().to_string()).collect(),
            permission_type,
        });
        self.pause().await;

        let behavior = lock(&self.escalation).clone();
        behavior.answer(permissions)
    }

    async fn close_session(&self, _token: &AccessToken) -> Result<(), AuthError> {
        lock(&self.calls).push(ProviderCall::Close);
        self.pause().await;
        lock(&self.logout).clone()
    }
}
