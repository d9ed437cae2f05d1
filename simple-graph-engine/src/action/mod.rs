//! Actions: the unit of work handed to the dispatcher
//!
//! An [`Action`] is a tagged variant over everything the client can do.
//! Request shaping lives in [`shape`], response decoding in [`decode`],
//! and the scope each variant needs in [`crate::permission::requirement`].

mod decode;
mod shape;

use serde::Serialize;
use simple_graph_api::{
    AppRequest, Feed, Page, Params, Permission, Photo, Profile, Properties, Publishable,
};

use crate::dialog::InviteRequest;
use crate::error::{ActionError, ActionResult};
use crate::session::PermissionsGranted;

pub(crate) use decode::decode;
pub use shape::validate_request_id;

/// One operation to dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Raw get of `{target}/{edge}`; the caller owns the parameters
    Get {
        target: String,
        edge: Option<String>,
        params: Params,
    },
    GetAppRequests,
    GetFriends {
        properties: Option<Properties>,
    },
    GetProfile {
        target: String,
        properties: Option<Properties>,
    },
    /// Photos of `target`, the logged-in user when `None`
    GetPhotos {
        target: Option<String>,
    },
    /// Silent publish
    Publish {
        publishable: Publishable,
        target: String,
    },
    /// Publish through the feed dialog, silently if the dialog cannot open
    PublishWithDialog {
        feed: Feed,
        target: String,
    },
    Invite(InviteRequest),
    /// Delete an app request by its `{user}_{request}` id
    DeleteRequest {
        request_id: String,
    },
    RequestPermissions {
        permissions: Vec<Permission>,
        show_publish_immediately: bool,
    },
    /// Report an app install for the configured app id
    ActivateApp,
}

impl Action {
    /// Stable name for logs and audit records
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::GetAppRequests => "get_app_requests",
            Self::GetFriends { .. } => "get_friends",
            Self::GetProfile { .. } => "get_profile",
            Self::GetPhotos { .. } => "get_photos",
            Self::Publish { .. } => "publish",
            Self::PublishWithDialog { .. } => "publish_with_dialog",
            Self::Invite(_) => "invite",
            Self::DeleteRequest { .. } => "delete_request",
            Self::RequestPermissions { .. } => "request_permissions",
            Self::ActivateApp => "activate_app",
        }
    }
}

/// Outcome of a publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PublishOutcome {
    /// Published; the id is absent only when a dialog did not report one
    Posted { id: Option<String> },
    /// The user closed the dialog without posting
    CancelledByUser,
}

/// Outcome of an invite dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum InviteOutcome {
    Sent {
        request_id: Option<String>,
        recipients: Vec<String>,
    },
    CancelledByUser,
}

/// Decoded result of any action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    Raw(serde_json::Value),
    AppRequests(Page<AppRequest>),
    Friends(Page<Profile>),
    Profile(Profile),
    Photos(Page<Photo>),
    Published(PublishOutcome),
    Invited(InviteOutcome),
    Deleted,
    PermissionsGranted(PermissionsGranted),
    Activated,
}

impl ActionOutput {
    fn variant(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::AppRequests(_) => "app_requests",
            Self::Friends(_) => "friends",
            Self::Profile(_) => "profile",
            Self::Photos(_) => "photos",
            Self::Published(_) => "published",
            Self::Invited(_) => "invited",
            Self::Deleted => "deleted",
            Self::PermissionsGranted(_) => "permissions_granted",
            Self::Activated => "activated",
        }
    }
}

/// Typed view of an [`ActionOutput`]
pub trait FromOutput: Sized {
    fn from_output(output: ActionOutput) -> ActionResult<Self>;
}

fn unexpected<T>(expected: &str, output: &ActionOutput) -> ActionResult<T> {
    Err(ActionError::MalformedResponse(format!(
        "expected {} output, got {}",
        expected,
        output.variant()
    )))
}

macro_rules! from_output {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromOutput for $ty {
            fn from_output(output: ActionOutput) -> ActionResult<Self> {
                match output {
                    ActionOutput::$variant(value) => Ok(value),
                    other => unexpected($name, &other),
                }
            }
        }
    };
}

from_output!(serde_json::Value, Raw, "raw");
from_output!(Page<AppRequest>, AppRequests, "app_requests");
from_output!(Page<Profile>, Friends, "friends");
from_output!(Profile, Profile, "profile");
from_output!(Page<Photo>, Photos, "photos");
from_output!(PublishOutcome, Published, "published");
from_output!(InviteOutcome, Invited, "invited");
from_output!(PermissionsGranted, PermissionsGranted, "permissions_granted");

impl FromOutput for ActionOutput {
    fn from_output(output: ActionOutput) -> ActionResult<Self> {
        Ok(output)
    }
}

/// Delete and install report carry no data
impl FromOutput for () {
    fn from_output(output: ActionOutput) -> ActionResult<Self> {
        match output {
            ActionOutput::Deleted | ActionOutput::Activated => Ok(()),
            other => unexpected("unit", &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_distinct() {
        let actions = [
            Action::GetAppRequests,
            Action::GetFriends { properties: None },
            Action::GetPhotos { target: None },
            Action::ActivateApp,
        ];
        let names: std::collections::BTreeSet<_> = actions.iter().map(Action::name).collect();
        assert_eq!(names.len(), actions.len());
    }

    #[test]
    fn test_from_output_match() {
        let profile = Profile {
            id: "1".into(),
            ..Default::default()
        };
        let typed = Profile::from_output(ActionOutput::Profile(profile.clone())).unwrap();
        assert_eq!(typed, profile);
        assert!(<()>::from_output(ActionOutput::Deleted).is_ok());
    }

    #[test]
    fn test_from_output_mismatch() {
        let err = Profile::from_output(ActionOutput::Deleted).unwrap_err();
        assert!(matches!(err, ActionError::MalformedResponse(_)));
        assert!(err.to_string().contains("expected profile"));
    }
}
