//! # simple-graph
//!
//! A session-aware client facade for a social graph API that uses
//! OAuth-style tokens and scoped permissions.
//!
//! ## Core Principles
//!
//! - **Explicit session**: no process-wide singleton; the session lives in
//!   the [`SimpleGraph`] you build
//! - **Lazy permissions**: publish scopes are requested the first time a
//!   publish needs them
//! - **One result per call**: every call returns a [`Completion`] that
//!   resolves once, or to `None` after [`SimpleGraph::clean`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use simple_graph::{Feed, GraphConfig, Permission, SimpleGraph};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GraphConfig::builder()
//!         .app_id("625994234086470")
//!         .namespace("sromku_sample")
//!         .permissions(&[Permission::UserPhotos, Permission::PublishAction])
//!         .build()?;
//!
//!     let graph = SimpleGraph::builder()
//!         .config(config)
//!         .session_provider(MyLoginFlow::new())
//!         .transport(MyHttpTransport::new())
//!         .build()?;
//!
//!     graph.login().await.ok_or("torn down")??;
//!
//!     let feed = Feed::builder().message("Hello").build();
//!     match graph.publish_feed(feed).await {
//!         Some(Ok(outcome)) => println!("{:?}", outcome),
//!         Some(Err(e)) => eprintln!("{}", e),
//!         None => {}
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

pub mod tracing_support;

// Re-export tracing itself (required for #[instrument] macro)
#[cfg(feature = "tracing")]
pub use tracing_support::tracing;

#[cfg(feature = "tracing")]
pub use tracing_support::{
    init_subscriber, init_subscriber_with_config, TracingConfig, TracingFormat,
};

pub use simple_graph_api::{
    AppRequest, Feed, FeedBuilder, IdName, Page, Paging, Params, ParamValue, Permission,
    PermissionType, Photo, PhotoSource, PhotoUpload, PictureAttributes, PictureType, Profile,
    Properties, PropertiesBuilder, Publishable, Story,
};
pub use simple_graph_engine::{
    AccessToken, Action, ActionError, ActionOutput, ActionResult, AuditSink, AuthError,
    Completion, ConfigError, DefaultEscalationPolicy, DialogError, DialogKind, DialogProvider,
    DialogRequest, DialogResponse, Dispatcher, EscalationPolicy, FileAuditSink, GraphConfig,
    GraphRequest, GraphResponse, GraphTransport, HostContext, HttpMethod, InviteOutcome,
    InviteRequest, MemoryAuditSink, NeverEscalatePolicy, OpenedSession, PermissionsGranted,
    PublishOutcome, RepromptEscalationPolicy, SessionClosed, SessionManager, SessionOpened,
    SessionPhase, SessionProvider, TransitionPolicy, TransportError, UnavailableDialogProvider,
};

/// Target that designates the logged-in user
pub const ME: &str = simple_graph_engine::permission::ME;

/// Error type for [`SimpleGraphBuilder::build`]
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No configuration provided")]
    MissingConfig,

    #[error("No session provider provided")]
    MissingSessionProvider,

    #[error("No graph transport provided")]
    MissingTransport,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// Facade
// ============================================================================

/// Client facade: builds actions and hands them to the dispatcher
///
/// Every method that talks to the network or the user returns a
/// [`Completion`] and must be called from within a tokio runtime.
pub struct SimpleGraph {
    dispatcher: Dispatcher,
    context: Mutex<HostContext>,
}

impl SimpleGraph {
    pub fn builder() -> SimpleGraphBuilder {
        SimpleGraphBuilder::default()
    }

    pub fn config(&self) -> &GraphConfig {
        self.dispatcher.session().config()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.dispatcher.session()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ========================================================================
    // Host context
    // ========================================================================

    /// Current host context, replacing it first if it was torn down
    pub fn attach_context(&self) -> HostContext {
        let mut context = self.context.lock().unwrap_or_else(PoisonError::into_inner);
        if context.is_torn_down() {
            *context = HostContext::new();
            #[cfg(feature = "tracing")]
            tracing::debug!("Host context attached");
        }
        context.clone()
    }

    /// Tear down the host context; pending results are discarded
    pub fn clean(&self) {
        self.current_context().teardown();
        #[cfg(feature = "tracing")]
        tracing::debug!("Host context cleaned");
    }

    fn current_context(&self) -> HostContext {
        self.context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn dispatch<T>(&self, action: Action) -> Completion<T>
    where
        T: simple_graph_engine::FromOutput + Send + 'static,
    {
        self.dispatcher.dispatch_as(&self.current_context(), action)
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub fn login(&self) -> Completion<SessionOpened, AuthError> {
        let session = self.session().clone();
        self.dispatcher
            .spawn_bound(&self.current_context(), async move { session.login().await })
    }

    pub fn logout(&self) -> Completion<SessionClosed, AuthError> {
        let session = self.session().clone();
        self.dispatcher
            .spawn_bound(&self.current_context(), async move { session.logout().await })
    }

    /// Open session with a valid token
    pub async fn is_login(&self) -> bool {
        self.session().is_logged_in(true).await
    }

    pub fn request_new_permissions(
        &self,
        permissions: &[Permission],
        show_publish: bool,
    ) -> Completion<PermissionsGranted> {
        self.dispatch(Action::RequestPermissions {
            permissions: permissions.to_vec(),
            show_publish_immediately: show_publish,
        })
    }

    pub async fn granted_permissions(&self) -> BTreeSet<String> {
        self.session().granted_permissions().await
    }

    /// Every configured read and publish permission is granted
    pub async fn is_all_permissions_granted(&self) -> bool {
        let config = self.config();
        let granted = self.granted_permissions().await;
        simple_graph_api::is_satisfied(
            config
                .read_permissions
                .iter()
                .chain(config.publish_permissions.iter()),
            &granted,
        )
    }

    pub async fn access_token(&self) -> Option<AccessToken> {
        self.session().access_token().await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Raw get of `{entity}/{edge}`
    pub fn get(
        &self,
        entity: &str,
        edge: Option<&str>,
        params: Params,
    ) -> Completion<serde_json::Value> {
        self.dispatch(Action::Get {
            target: entity.to_string(),
            edge: edge.map(str::to_string),
            params,
        })
    }

    pub fn get_app_requests(&self) -> Completion<Page<AppRequest>> {
        self.dispatch(Action::GetAppRequests)
    }

    pub fn get_friends(&self, properties: Option<Properties>) -> Completion<Page<Profile>> {
        self.dispatch(Action::GetFriends { properties })
    }

    pub fn get_profile(&self, properties: Option<Properties>) -> Completion<Profile> {
        self.get_profile_of(ME, properties)
    }

    pub fn get_profile_of(
        &self,
        entity: &str,
        properties: Option<Properties>,
    ) -> Completion<Profile> {
        self.dispatch(Action::GetProfile {
            target: entity.to_string(),
            properties,
        })
    }

    pub fn get_photos(&self) -> Completion<Page<Photo>> {
        self.dispatch(Action::GetPhotos { target: None })
    }

    pub fn get_photos_of(&self, entity: &str) -> Completion<Page<Photo>> {
        self.dispatch(Action::GetPhotos {
            target: Some(entity.to_string()),
        })
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    pub fn publish(&self, publishable: Publishable, target: &str) -> Completion<PublishOutcome> {
        self.dispatch(Action::Publish {
            publishable,
            target: target.to_string(),
        })
    }

    pub fn publish_feed(&self, feed: Feed) -> Completion<PublishOutcome> {
        self.publish(feed.into(), ME)
    }

    /// With `with_dialog` the feed dialog is tried first and a silent
    /// publish is issued only if it cannot open
    pub fn publish_feed_with_dialog(
        &self,
        feed: Feed,
        with_dialog: bool,
    ) -> Completion<PublishOutcome> {
        if !with_dialog {
            return self.publish_feed(feed);
        }
        self.dispatch(Action::PublishWithDialog {
            feed,
            target: ME.to_string(),
        })
    }

    pub fn publish_story(&self, story: Story) -> Completion<PublishOutcome> {
        self.publish(story.into(), ME)
    }

    /// Upload into `album`, or the app album when `None`
    pub fn publish_photo(
        &self,
        photo: PhotoUpload,
        album: Option<&str>,
    ) -> Completion<PublishOutcome> {
        self.publish(photo.into(), album.unwrap_or(ME))
    }

    // ========================================================================
    // App requests
    // ========================================================================

    pub fn invite(
        &self,
        message: Option<String>,
        data: Option<String>,
    ) -> Completion<InviteOutcome> {
        self.dispatch(Action::Invite(
            InviteRequest::new().message(message).data(data),
        ))
    }

    pub fn invite_to(
        &self,
        to: &str,
        message: Option<String>,
        data: Option<String>,
    ) -> Completion<InviteOutcome> {
        self.dispatch(Action::Invite(
            InviteRequest::new().to(to).message(message).data(data),
        ))
    }

    pub fn invite_suggested<I, S>(
        &self,
        suggested: I,
        message: Option<String>,
        data: Option<String>,
    ) -> Completion<InviteOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dispatch(Action::Invite(
            InviteRequest::new()
                .suggestions(suggested)
                .message(message)
                .data(data),
        ))
    }

    /// Delete an app request by its `{userId}_{requestId}` id
    pub fn delete_request(&self, request_id: &str) -> Completion<()> {
        self.dispatch(Action::DeleteRequest {
            request_id: request_id.to_string(),
        })
    }

    /// Report an app install; works without a session
    pub fn app_launched(&self) -> Completion<()> {
        self.dispatch(Action::ActivateApp)
    }
}

impl std::fmt::Debug for SimpleGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleGraph")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`SimpleGraph`]
///
/// Config, session provider and transport are required. Dialogs default to
/// [`UnavailableDialogProvider`] (every dialog publish goes silent), the
/// escalation policy to [`DefaultEscalationPolicy`] and auditing to none.
#[derive(Default)]
pub struct SimpleGraphBuilder {
    config: Option<GraphConfig>,
    provider: Option<Arc<dyn SessionProvider>>,
    transport: Option<Arc<dyn GraphTransport>>,
    dialogs: Option<Arc<dyn DialogProvider>>,
    policy: Option<Arc<dyn EscalationPolicy>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SimpleGraphBuilder {
    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn session_provider(mut self, provider: impl SessionProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn session_provider_arc(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn transport(mut self, transport: impl GraphTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn transport_arc(mut self, transport: Arc<dyn GraphTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn dialogs(mut self, dialogs: impl DialogProvider + 'static) -> Self {
        self.dialogs = Some(Arc::new(dialogs));
        self
    }

    pub fn dialogs_arc(mut self, dialogs: Arc<dyn DialogProvider>) -> Self {
        self.dialogs = Some(dialogs);
        self
    }

    pub fn escalation_policy(mut self, policy: impl EscalationPolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> Result<SimpleGraph, BuildError> {
        let config = self.config.ok_or(BuildError::MissingConfig)?;
        config.validate()?;
        let provider = self.provider.ok_or(BuildError::MissingSessionProvider)?;
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        let dialogs = self
            .dialogs
            .unwrap_or_else(|| Arc::new(UnavailableDialogProvider));

        let mut session = SessionManager::new(Arc::new(config), provider);
        if let Some(audit) = self.audit {
            session = session.with_audit(audit);
        }

        let mut dispatcher = Dispatcher::new(Arc::new(session), transport, dialogs);
        if let Some(policy) = self.policy {
            dispatcher = dispatcher.with_policy(policy);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(app_id = %dispatcher.session().config().app_id, "SimpleGraph built");

        Ok(SimpleGraph {
            dispatcher,
            context: Mutex::new(HostContext::new()),
        })
    }
}
