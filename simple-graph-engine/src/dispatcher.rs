//! Action dispatcher
//!
//! Every dispatched action runs as its own tokio task and reports through a
//! [`Completion`]. The task is bound to the [`HostContext`] current at
//! dispatch time: once that context is torn down, the completion resolves
//! to `None` and the result is dropped. A task already running is never
//! aborted, so a session transition it started always finishes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use simple_graph_api::Publishable;

use crate::action::{self, Action, ActionOutput, FromOutput, InviteOutcome, PublishOutcome};
use crate::audit::{self, AuditEvent, AuditEventType};
use crate::dialog::{DialogKind, DialogProvider, DialogRequest, InviteRequest};
use crate::error::{ActionError, ActionResult, DialogError};
use crate::permission::{
    required_permission, requires_session, DefaultEscalationPolicy, EscalationPolicy, ME,
};
use crate::session::SessionManager;
use crate::transport::GraphTransport;

// ============================================================================
// Host context
// ============================================================================

/// Lifetime of the caller that receives results
///
/// Tearing the context down discards every result still pending for it.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    token: CancellationToken,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teardown(&self) {
        self.token.cancel();
    }

    pub fn is_torn_down(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ============================================================================
// Completion
// ============================================================================

/// Pending result of a dispatched call
///
/// Resolves to `Some(result)` exactly once, or to `None` as soon as the
/// host context is torn down.
#[must_use = "awaiting a completion is the only way to observe its result"]
pub struct Completion<T, E = ActionError> {
    inner: Pin<Box<dyn Future<Output = Option<Result<T, E>>> + Send>>,
}

impl<T, E> Completion<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn bound(receiver: oneshot::Receiver<Result<T, E>>, token: CancellationToken) -> Self {
        Self {
            inner: Box::pin(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = receiver => result.ok(),
                }
            }),
        }
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Option<Result<T, E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T, E> std::fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Runs actions against the session, the transport and the dialog host
#[derive(Clone)]
pub struct Dispatcher {
    session: Arc<SessionManager>,
    transport: Arc<dyn GraphTransport>,
    dialogs: Arc<dyn DialogProvider>,
    policy: Arc<dyn EscalationPolicy>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<SessionManager>,
        transport: Arc<dyn GraphTransport>,
        dialogs: Arc<dyn DialogProvider>,
    ) -> Self {
        Self {
            session,
            transport,
            dialogs,
            policy: Arc::new(DefaultEscalationPolicy),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn EscalationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Run any future as a task bound to `ctx`
    ///
    /// Nothing starts if `ctx` is already torn down. Once started, the
    /// future always runs to the end; teardown only withholds its result.
    /// Must be called from within a tokio runtime.
    pub fn spawn_bound<T, E, F>(&self, ctx: &HostContext, future: F) -> Completion<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let token = ctx.token.clone();

        if token.is_cancelled() {
            tracing::debug!("Host context already torn down, nothing dispatched");
            return Completion::bound(receiver, token);
        }

        let bound = token.clone();
        tokio::spawn(async move {
            let result = future.await;
            if bound.is_cancelled() {
                tracing::debug!("Host context torn down, result discarded");
            } else if sender.send(result).is_err() {
                tracing::debug!("Completion dropped before delivery");
            }
        });

        Completion::bound(receiver, token)
    }

    /// Dispatch an action; the completion carries its untyped output
    pub fn dispatch(&self, ctx: &HostContext, action: Action) -> Completion<ActionOutput> {
        self.dispatch_as(ctx, action)
    }

    /// Dispatch an action and convert its output
    pub fn dispatch_as<T>(&self, ctx: &HostContext, action: Action) -> Completion<T>
    where
        T: FromOutput + Send + 'static,
    {
        let this = self.clone();
        self.spawn_bound(ctx, async move {
            this.execute(action).await.and_then(T::from_output)
        })
    }

    /// Run an action to completion on the current task
    pub async fn execute(&self, action: Action) -> ActionResult<ActionOutput> {
        let name = action.name();
        let result = self.run(action).await;
        match &result {
            Ok(_) => tracing::debug!(action = name, "Action succeeded"),
            Err(e) if e.is_local() => {
                tracing::debug!(action = name, error = %e, "Action refused without a request")
            }
            Err(e) => tracing::info!(action = name, error = %e, "Action failed"),
        }
        result
    }

    async fn run(&self, action: Action) -> ActionResult<ActionOutput> {
        action.validate()?;

        if requires_session(&action) && !self.session.is_logged_in(true).await {
            return Err(ActionError::NotLoggedIn);
        }

        match action {
            Action::RequestPermissions {
                permissions,
                show_publish_immediately,
            } => self
                .session
                .request_new_permissions(&permissions, show_publish_immediately)
                .await
                .map(ActionOutput::PermissionsGranted)
                .map_err(|e| {
                    ActionError::from_permission_request(e, permissions.iter().map(|p| p.value()))
                }),
            Action::PublishWithDialog { feed, target } => {
                self.publish_with_dialog(feed.into(), target).await
            }
            Action::Invite(invite) => self.invite(invite).await,
            other => self.call_graph(other).await,
        }
    }

    /// Escalate if needed, send, decode
    async fn call_graph(&self, action: Action) -> ActionResult<ActionOutput> {
        let name = action.name();

        if let Some(required) = required_permission(&action) {
            self.session
                .escalate_for(name, required, self.policy.as_ref())
                .await?;
        }

        let config = self.session.config();
        let mut request = action.to_request(config)?.ok_or_else(|| {
            ActionError::invalid_argument("action", format!("{} has no graph request", name))
        })?;
        request.access_token = self
            .session
            .access_token()
            .await
            .map(|token| token.value().to_string());

        tracing::debug!(
            action = name,
            method = %request.method,
            path = %request.path(),
            "Calling graph"
        );
        let response = self.transport.call(request).await?;
        action::decode(&action, response)
    }

    async fn publish_with_dialog(
        &self,
        publishable: Publishable,
        target: String,
    ) -> ActionResult<ActionOutput> {
        let mut params = publishable.to_params();
        if target != ME {
            params.insert("to", target.clone());
        }
        let request = DialogRequest {
            app_id: self.session.config().app_id.clone(),
            kind: DialogKind::Feed,
            params,
        };

        match self.dialogs.present(request).await {
            Ok(response) => Ok(ActionOutput::Published(PublishOutcome::Posted {
                id: response.id,
            })),
            Err(DialogError::CancelledByUser) => {
                Ok(ActionOutput::Published(PublishOutcome::CancelledByUser))
            }
            Err(e) if e.allows_silent_fallback() => {
                tracing::warn!(error = %e, "Feed dialog unavailable, publishing silently");
                audit::record(
                    self.session.audit().as_ref(),
                    AuditEvent::new(AuditEventType::DialogFallback)
                        .with_action("publish_with_dialog")
                        .with_reason(e.to_string()),
                );
                self.call_graph(Action::Publish {
                    publishable,
                    target,
                })
                .await
            }
            Err(e) => Err(ActionError::Dialog(e)),
        }
    }

    async fn invite(&self, invite: InviteRequest) -> ActionResult<ActionOutput> {
        let request = DialogRequest {
            app_id: self.session.config().app_id.clone(),
            kind: DialogKind::Requests,
            params: invite.to_params(),
        };

        match self.dialogs.present(request).await {
            Ok(response) => Ok(ActionOutput::Invited(InviteOutcome::Sent {
                request_id: response.id,
                recipients: response.recipients,
            })),
            Err(DialogError::CancelledByUser) => {
                Ok(ActionOutput::Invited(InviteOutcome::CancelledByUser))
            }
            Err(e) => Err(ActionError::Dialog(e)),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
