//! Integration tests for action dispatch

use serde_json::json;
use simple_graph_api::{
    Feed, Page, Params, Permission, PermissionType, PhotoUpload, Profile, Publishable,
};
use simple_graph_engine::{
    Action, ActionError, ActionOutput, AuditEventType, DialogError, Dispatcher, GraphConfig,
    HostContext, HttpMethod, InviteOutcome, InviteRequest, MemoryAuditSink, NeverEscalatePolicy,
    ProviderBehavior, ProviderCall, PublishOutcome, RecordingTransport, ScriptedDialogProvider,
    ScriptedSessionProvider, SessionManager, TransportError,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    provider: Arc<ScriptedSessionProvider>,
    transport: Arc<RecordingTransport>,
    dialogs: Arc<ScriptedDialogProvider>,
    audit: Arc<MemoryAuditSink>,
    dispatcher: Dispatcher,
    ctx: HostContext,
}

impl Harness {
    fn new(
        provider: ScriptedSessionProvider,
        transport: RecordingTransport,
        dialogs: ScriptedDialogProvider,
    ) -> Self {
        let config = GraphConfig::builder()
            .app_id("app")
            .namespace("sample")
            .permissions(&[Permission::Email, Permission::PublishAction])
            .build()
            .expect("valid config");
        let provider = Arc::new(provider);
        let transport = Arc::new(transport);
        let dialogs = Arc::new(dialogs);
        let audit = Arc::new(MemoryAuditSink::new());

        let session = Arc::new(
            SessionManager::new(Arc::new(config), provider.clone()).with_audit(audit.clone()),
        );
        let dispatcher = Dispatcher::new(session, transport.clone(), dialogs.clone());

        Self {
            provider,
            transport,
            dialogs,
            audit,
            dispatcher,
            ctx: HostContext::new(),
        }
    }

    fn with_transport(transport: RecordingTransport) -> Self {
        Self::new(
            ScriptedSessionProvider::granting(),
            transport,
            ScriptedDialogProvider::unavailable(),
        )
    }

    async fn login(self) -> Self {
        self.dispatcher
            .session()
            .login()
            .await
            .expect("login succeeds");
        self
    }

    async fn run(&self, action: Action) -> Result<ActionOutput, ActionError> {
        self.dispatcher
            .dispatch(&self.ctx, action)
            .await
            .expect("context is alive")
    }
}

fn feed() -> Feed {
    Feed::builder()
        .message("Hello")
        .link("https://example.com")
        .build()
}

fn publish_feed() -> Action {
    Action::Publish {
        publishable: Publishable::Feed(feed()),
        target: "me".into(),
    }
}

// ============================================================================
// Validation and login guard
// ============================================================================

#[tokio::test]
async fn test_delete_request_malformed_id_fails_fast() {
    let h = Harness::with_transport(RecordingTransport::new()).login().await;

    let err = h
        .run(Action::DeleteRequest {
            request_id: "12345".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::InvalidArgument { .. }));
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_delete_request_validated_before_login_check() {
    let h = Harness::with_transport(RecordingTransport::new());

    let err = h
        .run(Action::DeleteRequest {
            request_id: "no-underscore".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_delete_request_well_formed_calls_transport() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("12345_67890", json!(true)),
    )
        .login()
        .await;

    let output = h
        .run(Action::DeleteRequest {
            request_id: "12345_67890".into(),
        })
        .await
        .unwrap();

    assert_eq!(output, ActionOutput::Deleted);
    let request = h.transport.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Delete);
    assert_eq!(request.path(), "12345_67890");
    assert_eq!(request.access_token.as_deref(), Some("scripted-token"));
}

#[tokio::test]
async fn test_photos_while_closed_is_not_logged_in() {
    let h = Harness::new(
        ScriptedSessionProvider::granting().with_login(ProviderBehavior::Cancel),
        RecordingTransport::new(),
        ScriptedDialogProvider::unavailable(),
    );
    assert!(h.dispatcher.session().login().await.is_err());

    let err = h.run(Action::GetPhotos { target: None }).await.unwrap_err();

    assert_eq!(err, ActionError::NotLoggedIn);
    assert_eq!(h.provider.escalation_count(), 0);
    assert_eq!(h.transport.call_count(), 0);
}

// ============================================================================
// Permission gating
// ============================================================================

#[tokio::test]
async fn test_publish_escalates_once_before_transport() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("me/feed", json!({"id": "1_2"})),
    )
        .login()
        .await;

    let output = h.run(publish_feed()).await.unwrap();

    assert_eq!(
        output,
        ActionOutput::Published(PublishOutcome::Posted {
            id: Some("1_2".into())
        })
    );
    assert_eq!(h.provider.escalation_count(), 1);
    assert!(h.provider.calls().contains(&ProviderCall::Request {
        permissions: vec!["publish_actions".into()],
        permission_type: PermissionType::Publish,
    }));
    assert_eq!(h.transport.call_count(), 1);
    assert_eq!(h.transport.last_request().unwrap().params, feed().to_params());
}

#[tokio::test]
async fn test_publish_escalation_denied_skips_transport() {
    let h = Harness::new(
        ScriptedSessionProvider::granting().with_escalation(ProviderBehavior::Deny("no".into())),
        RecordingTransport::new(),
        ScriptedDialogProvider::unavailable(),
    )
    .login()
    .await;

    let err = h.run(publish_feed()).await.unwrap_err();

    assert_eq!(
        err,
        ActionError::PermissionDenied(vec!["publish_actions".into()])
    );
    assert_eq!(h.provider.escalation_count(), 1);
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_denied_lazy_escalation_not_reprompted() {
    let h = Harness::new(
        ScriptedSessionProvider::granting().with_escalation(ProviderBehavior::GrantNone),
        RecordingTransport::new(),
        ScriptedDialogProvider::unavailable(),
    )
    .login()
    .await;

    for _ in 0..2 {
        let err = h.run(publish_feed()).await.unwrap_err();
        assert!(matches!(err, ActionError::PermissionDenied(_)));
    }

    assert_eq!(h.provider.escalation_count(), 1);
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_never_escalate_policy() {
    let h = Harness::with_transport(RecordingTransport::new()).login().await;
    let dispatcher = h
        .dispatcher
        .clone()
        .with_policy(Arc::new(NeverEscalatePolicy));

    let err = dispatcher
        .dispatch(&h.ctx, publish_feed())
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, ActionError::PermissionDenied(_)));
    assert_eq!(h.provider.escalation_count(), 0);
}

#[tokio::test]
async fn test_photo_publish_requires_publish_stream() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("me/photos", json!({"id": "5", "post_id": "1_5"})),
    )
        .login()
        .await;

    let output = h
        .run(Action::Publish {
            publishable: Publishable::Photo(PhotoUpload::from_url("https://example.com/p.png")),
            target: "me".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        output,
        ActionOutput::Published(PublishOutcome::Posted {
            id: Some("5".into())
        })
    );
    let asked = h
        .provider
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ProviderCall::Request { permissions, .. } => Some(permissions),
            _ => None,
        })
        .unwrap();
    assert!(asked.contains(&"publish_stream".to_string()));
}

#[tokio::test]
async fn test_friend_photos_require_friends_photos() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("42/photos", json!({"data": []})),
    )
        .login()
        .await;

    let output = h
        .run(Action::GetPhotos {
            target: Some("42".into()),
        })
        .await
        .unwrap();

    assert_eq!(output, ActionOutput::Photos(Page::default()));
    assert!(h.provider.calls().contains(&ProviderCall::Request {
        permissions: vec!["friends_photos".into()],
        permission_type: PermissionType::Read,
    }));
}

#[tokio::test]
async fn test_request_permissions_action() {
    let h = Harness::with_transport(RecordingTransport::new()).login().await;

    let output = h
        .run(Action::RequestPermissions {
            permissions: vec![Permission::UserPhotos],
            show_publish_immediately: false,
        })
        .await
        .unwrap();

    match output {
        ActionOutput::PermissionsGranted(result) => {
            assert!(result.granted.contains("user_photos"));
            assert!(result.granted.contains("email"));
        }
        other => panic!("Expected permissions, got {:?}", other),
    }
    assert_eq!(h.transport.call_count(), 0);
}

// ============================================================================
// Dialogs
// ============================================================================

#[tokio::test]
async fn test_dialog_unavailable_falls_back_to_silent_publish() {
    let h = Harness::new(
        ScriptedSessionProvider::granting(),
        RecordingTransport::new().respond_json("me/feed", json!({"id": "9"})),
        ScriptedDialogProvider::unavailable(),
    )
    .login()
    .await;

    let output = h
        .run(Action::PublishWithDialog {
            feed: feed(),
            target: "me".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        output,
        ActionOutput::Published(PublishOutcome::Posted {
            id: Some("9".into())
        })
    );
    assert_eq!(h.dialogs.presented().len(), 1);
    let request = h.transport.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path(), "me/feed");
    assert_eq!(request.params, feed().to_params());
    assert_eq!(h.audit.find_by_type(AuditEventType::DialogFallback).len(), 1);
}

#[tokio::test]
async fn test_dialog_fallback_reports_silent_failure() {
    let h = Harness::new(
        ScriptedSessionProvider::granting(),
        RecordingTransport::new().respond_error("me/feed", TransportError::Network("down".into())),
        ScriptedDialogProvider::new(Err(DialogError::Failed("crashed".into()))),
    )
    .login()
    .await;

    let err = h
        .run(Action::PublishWithDialog {
            feed: feed(),
            target: "me".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err, ActionError::Network("down".into()));
}

#[tokio::test]
async fn test_dialog_completed() {
    let h = Harness::new(
        ScriptedSessionProvider::granting(),
        RecordingTransport::new(),
        ScriptedDialogProvider::completing("post-7"),
    )
    .login()
    .await;

    let output = h
        .run(Action::PublishWithDialog {
            feed: feed(),
            target: "me".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        output,
        ActionOutput::Published(PublishOutcome::Posted {
            id: Some("post-7".into())
        })
    );
    assert_eq!(h.transport.call_count(), 0);
    assert_eq!(h.provider.escalation_count(), 0);
}

#[tokio::test]
async fn test_dialog_cancelled_by_user() {
    let h = Harness::new(
        ScriptedSessionProvider::granting(),
        RecordingTransport::new(),
        ScriptedDialogProvider::cancelled(),
    )
    .login()
    .await;

    let output = h
        .run(Action::PublishWithDialog {
            feed: feed(),
            target: "me".into(),
        })
        .await
        .unwrap();

    assert_eq!(output, ActionOutput::Published(PublishOutcome::CancelledByUser));
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_invite_dialog() {
    let h = Harness::new(
        ScriptedSessionProvider::granting(),
        RecordingTransport::new(),
        ScriptedDialogProvider::completing("req-1"),
    )
    .login()
    .await;

    let output = h
        .run(Action::Invite(
            InviteRequest::new()
                .to("42")
                .message(Some("Join me".into())),
        ))
        .await
        .unwrap();

    assert_eq!(
        output,
        ActionOutput::Invited(InviteOutcome::Sent {
            request_id: Some("req-1".into()),
            recipients: vec![],
        })
    );
    let presented = h.dialogs.presented();
    assert_eq!(presented[0].app_id, "app");
    assert_eq!(presented[0].params.text("to"), Some("42"));
    assert_eq!(h.provider.escalation_count(), 0);
}

#[tokio::test]
async fn test_invite_dialog_unavailable_is_error() {
    let h = Harness::with_transport(RecordingTransport::new()).login().await;

    let err = h.run(Action::Invite(InviteRequest::new())).await.unwrap_err();

    assert_eq!(
        err,
        ActionError::Dialog(DialogError::Unavailable("scripted".into()))
    );
    assert_eq!(h.transport.call_count(), 0);
}

// ============================================================================
// Decoding and classification
// ============================================================================

#[tokio::test]
async fn test_friends_typed_with_default_fields() {
    let h = Harness::with_transport(RecordingTransport::new().respond_json(
        "me/friends",
        json!({"data": [{"id": "1", "name": "Ann"}]}),
    ))
    .login()
    .await;

    let page: Page<Profile> = h
        .dispatcher
        .dispatch_as(&h.ctx, Action::GetFriends { properties: None })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, "1");
    assert_eq!(
        h.transport.last_request().unwrap().params.text("fields"),
        Some("id,name")
    );
}

#[tokio::test]
async fn test_server_error_classified() {
    let h = Harness::with_transport(RecordingTransport::new().respond_error(
        "me/apprequests",
        TransportError::Server {
            code: 4,
            message: "rate limited".into(),
        },
    ))
    .login()
    .await;

    let err = h.run(Action::GetAppRequests).await.unwrap_err();

    assert_eq!(
        err,
        ActionError::ServerRejected {
            code: 4,
            message: "rate limited".into()
        }
    );
    assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test]
async fn test_error_body_classified() {
    let h = Harness::with_transport(RecordingTransport::new().respond_json(
        "me",
        json!({"error": {"code": 190, "message": "expired"}}),
    ))
    .login()
    .await;

    let err = h
        .run(Action::GetProfile {
            target: "me".into(),
            properties: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::ServerRejected { code: 190, .. }));
}

#[tokio::test]
async fn test_malformed_response() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("me", json!("nope")),
    )
        .login()
        .await;

    let err = h
        .run(Action::GetProfile {
            target: "me".into(),
            properties: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_generic_get_passes_params() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("me/music", json!({"data": []})),
    )
    .login()
    .await;

    let output = h
        .run(Action::Get {
            target: "me".into(),
            edge: Some("music".into()),
            params: Params::new().with("limit", "5"),
        })
        .await
        .unwrap();

    assert_eq!(output, ActionOutput::Raw(json!({"data": []})));
    assert_eq!(
        h.transport.last_request().unwrap().params.text("limit"),
        Some("5")
    );
    assert_eq!(h.provider.escalation_count(), 0);
}

#[tokio::test]
async fn test_activate_app_without_session() {
    let h = Harness::with_transport(
        RecordingTransport::new().respond_json("app/activities", json!({"success": true})),
    );

    let result: Result<(), ActionError> = h
        .dispatcher
        .dispatch_as(&h.ctx, Action::ActivateApp)
        .await
        .unwrap();

    assert!(result.is_ok());
    let request = h.transport.last_request().unwrap();
    assert_eq!(request.params.text("event"), Some("MOBILE_APP_INSTALL"));
    assert!(request.access_token.is_none());
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn test_teardown_discards_pending_result() {
    let h = Harness::new(
        ScriptedSessionProvider::granting(),
        RecordingTransport::new(),
        ScriptedDialogProvider::completing("late").with_delay(Duration::from_millis(300)),
    )
    .login()
    .await;

    let completion = h.dispatcher.dispatch(
        &h.ctx,
        Action::PublishWithDialog {
            feed: feed(),
            target: "me".into(),
        },
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.ctx.teardown();

    assert_eq!(completion.await, None);
}

#[tokio::test]
async fn test_teardown_during_escalation_records_grant() {
    let h = Harness::new(
        ScriptedSessionProvider::granting().with_delay(Duration::from_millis(100)),
        RecordingTransport::new().respond_json("me/feed", json!({"id": "1_2"})),
        ScriptedDialogProvider::unavailable(),
    )
    .login()
    .await;

    let completion = h.dispatcher.dispatch(
        &h.ctx,
        Action::Publish {
            publishable: feed().into(),
            target: "me".into(),
        },
    );
    tokio::time::sleep(Duration::from_millis(30)).await;
    h.ctx.teardown();
    assert_eq!(completion.await, None);

    // queues behind the escalation still in flight
    h.dispatcher
        .session()
        .request_new_permissions(&[], false)
        .await
        .unwrap();
    assert!(h
        .dispatcher
        .session()
        .granted_permissions()
        .await
        .contains("publish_actions"));
    assert_eq!(h.provider.escalation_count(), 1);
}

#[tokio::test]
async fn test_fresh_context_after_teardown_delivers() {
    let h = Harness::with_transport(RecordingTransport::new()).login().await;
    h.ctx.teardown();

    let ctx = HostContext::new();
    let result = h.dispatcher.dispatch(&ctx, Action::GetAppRequests).await;

    assert!(result.is_some());
}

#[tokio::test]
async fn test_concurrent_actions_each_resolve_once() {
    let h = Harness::with_transport(
        RecordingTransport::new()
            .with_fallback(Ok(simple_graph_engine::GraphResponse::new(json!({"data": []})))),
    )
    .login()
    .await;

    let completions: Vec<_> = (0..5)
        .map(|_| h.dispatcher.dispatch(&h.ctx, Action::GetFriends { properties: None }))
        .collect();

    for completion in completions {
        let result = completion.await.expect("delivered");
        assert!(result.is_ok());
    }
    assert_eq!(h.transport.call_count(), 5);
}
