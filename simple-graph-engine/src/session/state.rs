//! Session state and transition results

use serde::Serialize;
use simple_graph_api::Permission;
use std::collections::BTreeSet;
use std::fmt;

use crate::provider::AccessToken;

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Opening,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Mutable session data, guarded by the session manager
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Granted wire values. Grows by union until logout.
    pub granted: BTreeSet<String>,
    pub token: Option<AccessToken>,
    /// Publish permissions to ask for on the first under-permissioned publish
    pub pending_publish: BTreeSet<Permission>,
    /// Permissions the user declined during this session
    pub denied: BTreeSet<Permission>,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    /// Reset to a closed, empty session
    pub(crate) fn close(&mut self) -> BTreeSet<String> {
        let revoked = std::mem::take(&mut self.granted);
        self.token = None;
        self.pending_publish.clear();
        self.denied.clear();
        self.phase = SessionPhase::Closed;
        revoked
    }
}

/// Result of `login`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOpened {
    /// Everything granted once login finished
    pub granted: BTreeSet<String>,
    /// The session was already open; nothing happened
    pub already_open: bool,
}

/// Result of `logout`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClosed {
    /// Wire values held right before closing
    pub revoked: BTreeSet<String>,
}

/// Result of `request_new_permissions`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionsGranted {
    /// Everything granted now, including earlier grants
    pub granted: BTreeSet<String>,
    /// What this call asked for
    pub requested: BTreeSet<Permission>,
    /// Asked for and not granted
    pub declined: BTreeSet<Permission>,
    /// Publish permissions left for the first publish
    pub deferred: BTreeSet<Permission>,
}

impl PermissionsGranted {
    /// Every requested permission is now granted
    pub fn is_complete(&self) -> bool {
        self.declined.is_empty() && self.deferred.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_resets_everything() {
        let mut state = SessionState {
            phase: SessionPhase::Open,
            granted: ["email".to_string()].into_iter().collect(),
            token: Some(AccessToken::new("t")),
            pending_publish: [Permission::PublishAction].into_iter().collect(),
            denied: [Permission::UserPhotos].into_iter().collect(),
        };

        let revoked = state.close();

        assert_eq!(revoked.len(), 1);
        assert_eq!(state.phase, SessionPhase::Closed);
        assert!(state.granted.is_empty());
        assert!(state.token.is_none());
        assert!(state.pending_publish.is_empty());
        assert!(state.denied.is_empty());
    }

    #[test]
    fn test_is_complete() {
        let mut result = PermissionsGranted::default();
        assert!(result.is_complete());

        result.deferred.insert(Permission::PublishStream);
        assert!(!result.is_complete());
    }
}
