//! Platform dialog collaborator
//!
//! Dialogs let the user confirm a post or an invite inside the platform UI.
//! The engine never renders anything itself; it hands a [`DialogRequest`]
//! to a [`DialogProvider`] and interprets the answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use simple_graph_api::Params;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::DialogError;
use crate::lock;

/// Which platform dialog to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    /// Share to feed
    Feed,
    /// App requests (invites)
    Requests,
}

/// A dialog to present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRequest {
    pub app_id: String,
    pub kind: DialogKind,
    pub params: Params,
}

/// What the user did in a completed dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogResponse {
    /// Post id (feed) or request id (requests), when the platform reports one
    pub id: Option<String>,
    /// Invited profile ids
    pub recipients: Vec<String>,
}

/// Invite dialog payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRequest {
    /// Single recipient
    pub to: Option<String>,
    /// Recipients pre-selected in a multi-friend selector
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub message: Option<String>,
    /// Opaque data attached to the request
    pub data: Option<String>,
}

impl InviteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(mut self, profile_id: impl Into<String>) -> Self {
        self.to = Some(profile_id.into());
        self
    }

    pub fn suggestions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn data(mut self, data: Option<String>) -> Self {
        self.data = data;
        self
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert_opt("message", self.message.clone());
        params.insert_opt("data", self.data.clone());
        params.insert_opt("to", self.to.clone());
        if !self.suggestions.is_empty() {
            params.insert("suggestions", self.suggestions.join(","));
        }
        params
    }
}

/// Dialog provider contract
#[async_trait]
pub trait DialogProvider: Send + Sync {
    /// Present a dialog and wait for the user
    async fn present(&self, request: DialogRequest) -> Result<DialogResponse, DialogError>;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Provider for headless hosts: every dialog is unavailable
///
/// With this provider a publish-with-dialog always takes the silent path.
#[derive(Debug, Default)]
pub struct UnavailableDialogProvider;

#[async_trait]
impl DialogProvider for UnavailableDialogProvider {
    async fn present(&self, request: DialogRequest) -> Result<DialogResponse, DialogError> {
        Err(DialogError::Unavailable(format!(
            "no dialog host for {:?} dialog",
            request.kind
        )))
    }
}

/// Provider that returns a configured answer and records presentations
#[derive(Debug)]
pub struct ScriptedDialogProvider {
    response: Mutex<Result<DialogResponse, DialogError>>,
    delay: Option<Duration>,
    presented: Mutex<Vec<DialogRequest>>,
}

impl ScriptedDialogProvider {
    pub fn new(response: Result<DialogResponse, DialogError>) -> Self {
        Self {
            response: Mutex::new(response),
            delay: None,
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Dialog completes with the given id
    pub fn completing(id: impl Into<String>) -> Self {
        Self::new(Ok(DialogResponse {
            id: Some(id.into()),
            recipients: Vec::new(),
        }))
    }

    pub fn unavailable() -> Self {
        Self::new(Err(DialogError::Unavailable("scripted".into())))
    }

    pub fn cancelled() -> Self {
        Self::new(Err(DialogError::CancelledByUser))
    }

    /// Keep the dialog open this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn presented(&self) -> Vec<DialogRequest> {
        lock(&self.presented).clone()
    }
}

#[async_trait]
impl DialogProvider for ScriptedDialogProvider {
    async fn present(&self, request: DialogRequest) -> Result<DialogResponse, DialogError> {
        lock(&self.presented).push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.response).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_params() {
        let params = InviteRequest::new()
            .suggestions(["1", "2"])
            .message(Some("join".into()))
            .to_params();

        assert_eq!(params.text("suggestions"), Some("1,2"));
        assert_eq!(params.text("message"), Some("join"));
        assert!(!params.contains_key("to"));
        assert!(!params.contains_key("data"));
    }

    #[tokio::test]
    async fn test_unavailable_provider() {
        let provider = UnavailableDialogProvider;
        let err = provider
            .present(DialogRequest {
                app_id: "1".into(),
                kind: DialogKind::Feed,
                params: Params::new(),
            })
            .await
            .unwrap_err();
        assert!(err.allows_silent_fallback());
    }

    #[tokio::test]
    async fn test_scripted_provider_records() {
        let provider = ScriptedDialogProvider::completing("post-1");
        let response = provider
            .present(DialogRequest {
                app_id: "1".into(),
                kind: DialogKind::Requests,
                params: Params::new(),
            })
            .await
            .unwrap();

        assert_eq!(response.id.as_deref(), Some("post-1"));
        assert_eq!(provider.presented().len(), 1);
    }
}
