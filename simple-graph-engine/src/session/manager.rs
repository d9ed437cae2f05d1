//! Single-writer session state machine
//!
//! Reads (granted scope, token, phase) take the state lock briefly and may
//! run concurrently. Transitions (login, logout, escalation) additionally
//! hold the transition gate for their whole duration, including the
//! provider round trip, so at most one is in flight at a time.

use simple_graph_api::{difference, split_by_type, Permission, PermissionType};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::audit::{self, AuditEvent, AuditEventType, AuditSink, NullAuditSink};
use crate::config::{GraphConfig, TransitionPolicy};
use crate::error::{ActionError, ActionResult, AuthError, AuthResult};
use crate::permission::{EscalationContext, EscalationDecision, EscalationPolicy};
use crate::provider::{AccessToken, SessionProvider};

use super::state::{PermissionsGranted, SessionClosed, SessionOpened, SessionPhase, SessionState};

/// Owns the session and serializes its transitions
pub struct SessionManager {
    config: Arc<GraphConfig>,
    provider: Arc<dyn SessionProvider>,
    audit: Arc<dyn AuditSink>,
    state: RwLock<SessionState>,
    transitions: Mutex<()>,
}

/// What one provider escalation call changed
struct Escalated {
    declined: BTreeSet<Permission>,
}

impl SessionManager {
    pub fn new(config: Arc<GraphConfig>, provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            config,
            provider,
            audit: Arc::new(NullAuditSink),
            state: RwLock::new(SessionState::default()),
            transitions: Mutex::new(()),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &Arc<GraphConfig> {
        &self.config
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    /// `strict` requires an open session with an unexpired token;
    /// otherwise any token still held counts
    pub async fn is_logged_in(&self, strict: bool) -> bool {
        let state = self.state.read().await;
        match (&state.token, strict) {
            (Some(token), true) => state.is_open() && token.is_valid(),
            (Some(_), false) => true,
            (None, _) => false,
        }
    }

    pub async fn granted_permissions(&self) -> BTreeSet<String> {
        self.state.read().await.granted.clone()
    }

    pub async fn access_token(&self) -> Option<AccessToken> {
        self.state.read().await.token.clone()
    }

    pub async fn pending_publish_permissions(&self) -> BTreeSet<Permission> {
        self.state.read().await.pending_publish.clone()
    }

    pub async fn denied_permissions(&self) -> BTreeSet<Permission> {
        self.state.read().await.denied.clone()
    }

    /// Copy of the whole state
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    async fn begin_transition(&self) -> AuthResult<MutexGuard<'_, ()>> {
        match self.config.transition_policy {
            TransitionPolicy::Queue => Ok(self.transitions.lock().await),
            TransitionPolicy::Reject => self.transitions.try_lock().map_err(|_| {
                tracing::debug!("Session transition rejected, another one is in flight");
                AuthError::Busy
            }),
        }
    }

    /// Open the session with the configured read permissions
    pub async fn login(&self) -> AuthResult<SessionOpened> {
        if let Some(opened) = self.already_open().await {
            return Ok(opened);
        }

        let _gate = self.begin_transition().await?;

        // opened by a login that held the gate before us
        if let Some(opened) = self.already_open().await {
            return Ok(opened);
        }
        let previous = std::mem::replace(
            &mut self.state.write().await.phase,
            SessionPhase::Opening,
        );

        let read_permissions = &self.config.read_permissions;
        tracing::info!(permissions = read_permissions.len(), "Opening session");

        let opened = match self.provider.open_session(read_permissions).await {
            Ok(opened) => opened,
            Err(e) => {
                let mut state = self.state.write().await;
                state.phase = match e {
                    AuthError::Transport(_) => previous,
                    _ => SessionPhase::Closed,
                };
                tracing::warn!(error = %e, phase = %state.phase, "Login failed");
                return Err(e);
            }
        };

        {
            let mut state = self.state.write().await;
            state.phase = SessionPhase::Open;
            state.token = Some(opened.token);
            state.granted = opened.granted.into_iter().collect();
            state.pending_publish.clear();
            state.denied.clear();
            audit::record(
                self.audit.as_ref(),
                AuditEvent::new(AuditEventType::SessionOpened)
                    .with_values(state.granted.iter().cloned()),
            );
            tracing::info!(granted = state.granted.len(), "Session opened");
        }

        let publish: BTreeSet<Permission> =
            self.config.publish_permissions.iter().copied().collect();
        if !publish.is_empty() {
            if self.config.ask_publish_on_login {
                if let Err(e) = self
                    .escalate_locked(&publish, PermissionType::Publish, "login")
                    .await
                {
                    tracing::warn!(error = %e, "Publish permissions not granted at login");
                }
            } else {
                self.defer_publish(&publish, "login").await;
            }
        }

        Ok(SessionOpened {
            granted: self.granted_permissions().await,
            already_open: false,
        })
    }

    async fn already_open(&self) -> Option<SessionOpened> {
        let state = self.state.read().await;
        if !state.is_open() {
            return None;
        }
        tracing::debug!("Login requested while already open");
        Some(SessionOpened {
            granted: state.granted.clone(),
            already_open: true,
        })
    }

    /// Close the session and forget everything it held
    pub async fn logout(&self) -> AuthResult<SessionClosed> {
        let _gate = self.begin_transition().await?;

        let token = {
            let mut state = self.state.write().await;
            let token = match (&state.token, state.is_open()) {
                (Some(token), true) => token.clone(),
                _ => return Err(AuthError::NotOpen),
            };
            state.phase = SessionPhase::Closing;
            token
        };

        tracing::info!("Closing session");
        if let Err(e) = self.provider.close_session(&token).await {
            self.state.write().await.phase = SessionPhase::Open;
            tracing::warn!(error = %e, "Logout failed, session stays open");
            return Err(e);
        }

        let revoked = self.state.write().await.close();
        audit::record(
            self.audit.as_ref(),
            AuditEvent::new(AuditEventType::SessionClosed).with_values(revoked.iter().cloned()),
        );
        tracing::info!(revoked = revoked.len(), "Session closed");
        Ok(SessionClosed { revoked })
    }

    /// Ask for more permissions on the open session
    ///
    /// Read permissions are requested right away. Publish permissions are
    /// requested right away when `show_publish_immediately` is set and
    /// otherwise left pending for the first publish. An explicit request
    /// clears earlier denials of what it asks for.
    pub async fn request_new_permissions(
        &self,
        permissions: &[Permission],
        show_publish_immediately: bool,
    ) -> AuthResult<PermissionsGranted> {
        let _gate = self.begin_transition().await?;

        let requested: BTreeSet<Permission> = permissions.iter().copied().collect();
        let (read, publish) = split_by_type(&requested);

        let (read_missing, publish_missing) = {
            let mut state = self.state.write().await;
            if !state.is_open() {
                return Err(AuthError::NotOpen);
            }
            state.denied.retain(|p| !requested.contains(p));
            (
                difference(&read, &state.granted),
                difference(&publish, &state.granted),
            )
        };

        let mut declined = BTreeSet::new();
        let mut deferred = BTreeSet::new();

        if !read_missing.is_empty() {
            let escalated = self
                .escalate_locked(&read_missing, PermissionType::Read, "request_permissions")
                .await?;
            declined.extend(escalated.declined);
        }

        if !publish_missing.is_empty() {
            if show_publish_immediately {
                let escalated = self
                    .escalate_locked(
                        &publish_missing,
                        PermissionType::Publish,
                        "request_permissions",
                    )
                    .await?;
                declined.extend(escalated.declined);
            } else {
                self.defer_publish(&publish_missing, "request_permissions")
                    .await;
                deferred = publish_missing;
            }
        }

        Ok(PermissionsGranted {
            granted: self.granted_permissions().await,
            requested,
            declined,
            deferred,
        })
    }

    /// Make sure `required` is granted before `action` runs, prompting if
    /// the policy allows it
    ///
    /// A publish escalation also asks for every pending publish
    /// permission in the same provider call.
    pub async fn escalate_for(
        &self,
        action: &str,
        required: Permission,
        policy: &dyn EscalationPolicy,
    ) -> ActionResult<()> {
        {
            let state = self.state.read().await;
            if !state.is_open() {
                return Err(ActionError::NotLoggedIn);
            }
            if state.granted.contains(required.value()) {
                return Ok(());
            }
        }

        let _gate = match self.begin_transition().await {
            Ok(gate) => gate,
            Err(e) => return Err(self.escalation_failed(action, &[required], e)),
        };

        let request = {
            let state = self.state.read().await;
            if !state.is_open() {
                return Err(ActionError::NotLoggedIn);
            }
            // granted by a transition that held the gate before us
            if state.granted.contains(required.value()) {
                return Ok(());
            }

            let missing = BTreeSet::from([required]);
            let ctx = EscalationContext {
                action,
                missing: &missing,
                granted: &state.granted,
                previously_denied: &state.denied,
            };
            if let EscalationDecision::Deny(reason) = policy.decide(&ctx) {
                tracing::info!(
                    action,
                    permission = %required,
                    %reason,
                    "Escalation refused by policy"
                );
                audit::record(
                    self.audit.as_ref(),
                    AuditEvent::new(AuditEventType::PermissionDenied)
                        .with_permissions(&missing)
                        .with_action(action)
                        .with_reason(reason),
                );
                return Err(ActionError::permission_denied([required.value()]));
            }

            let mut request = missing;
            if required.is_publish() {
                request.extend(difference(&state.pending_publish, &state.granted));
            }
            request
        };

        match self
            .escalate_locked(&request, required.permission_type(), action)
            .await
        {
            Ok(escalated) if !escalated.declined.contains(&required) => Ok(()),
            Ok(_) => Err(ActionError::permission_denied([required.value()])),
            Err(e) => Err(self.escalation_failed(action, &[required], e)),
        }
    }

    /// Any escalation that did not happen leaves `required` ungranted.
    /// User refusals were already recorded by `escalate_locked`.
    fn escalation_failed(
        &self,
        action: &str,
        required: &[Permission],
        e: AuthError,
    ) -> ActionError {
        if !e.is_user_refusal() && e != AuthError::NotOpen {
            audit::record(
                self.audit.as_ref(),
                AuditEvent::new(AuditEventType::PermissionDenied)
                    .with_permissions(required)
                    .with_action(action)
                    .with_reason(e.to_string()),
            );
        }
        tracing::info!(action, error = %e, "Escalation failed");
        ActionError::from_permission_request(e, required.iter().map(|p| p.value()))
    }

    /// One provider escalation call. Caller holds the transition gate.
    async fn escalate_locked(
        &self,
        permissions: &BTreeSet<Permission>,
        permission_type: PermissionType,
        action: &str,
    ) -> AuthResult<Escalated> {
        let token = self
            .state
            .read()
            .await
            .token
            .clone()
            .ok_or(AuthError::NotOpen)?;

        let requested: Vec<Permission> = permissions.iter().copied().collect();
        tracing::info!(
            action,
            %permission_type,
            permissions = ?requested,
            "Requesting permissions"
        );
        audit::record(
            self.audit.as_ref(),
            AuditEvent::new(AuditEventType::PermissionRequested)
                .with_permissions(&requested)
                .with_action(action),
        );

        let result = self
            .provider
            .request_permissions(&token, &requested, permission_type)
            .await;

        let mut state = self.state.write().await;
        match result {
            Ok(granted) => {
                state.granted.extend(granted);
                let declined = difference(permissions, &state.granted);
                state.denied.extend(declined.iter().copied());
                state.pending_publish.retain(|p| !permissions.contains(p));

                let newly: Vec<&Permission> = permissions
                    .iter()
                    .filter(|p| !declined.contains(p))
                    .collect();
                if !newly.is_empty() {
                    audit::record(
                        self.audit.as_ref(),
                        AuditEvent::new(AuditEventType::PermissionGranted)
                            .with_permissions(newly)
                            .with_action(action),
                    );
                }
                if !declined.is_empty() {
                    audit::record(
                        self.audit.as_ref(),
                        AuditEvent::new(AuditEventType::PermissionDenied)
                            .with_permissions(&declined)
                            .with_action(action)
                            .with_reason("declined by user"),
                    );
                }
                tracing::info!(
                    action,
                    granted = state.granted.len(),
                    declined = declined.len(),
                    "Permissions updated"
                );
                Ok(Escalated { declined })
            }
            Err(e) => {
                if e.is_user_refusal() {
                    state.denied.extend(permissions.iter().copied());
                    state.pending_publish.retain(|p| !permissions.contains(p));
                    audit::record(
                        self.audit.as_ref(),
                        AuditEvent::new(AuditEventType::PermissionDenied)
                            .with_permissions(permissions)
                            .with_action(action)
                            .with_reason(e.to_string()),
                    );
                }
                tracing::warn!(action, error = %e, "Permission request failed");
                Err(e)
            }
        }
    }

    async fn defer_publish(&self, permissions: &BTreeSet<Permission>, action: &str) {
        let mut state = self.state.write().await;
        let deferred = difference(permissions, &state.granted);
        if deferred.is_empty() {
            return;
        }
        state.pending_publish.extend(deferred.iter().copied());
        tracing::debug!(action, permissions = ?deferred, "Publish permissions deferred");
        audit::record(
            self.audit.as_ref(),
            AuditEvent::new(AuditEventType::PublishDeferred)
                .with_permissions(&deferred)
                .with_action(action),
        );
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("app_id", &self.config.app_id)
            .field("transition_policy", &self.config.transition_policy)
            .finish()
    }
}
