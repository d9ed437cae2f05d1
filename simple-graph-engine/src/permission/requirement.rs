//! Which permission each action needs
//!
//! This is the only place that maps actions to scopes. The dispatcher
//! consults it before every graph call.

use simple_graph_api::Permission;

use crate::action::Action;

/// Target that designates the logged-in user
pub const ME: &str = "me";

/// Permission an action must hold before its request is sent
///
/// Dialog actions need none (the platform asks for consent itself) and
/// neither does a generic get, whose caller knows what the edge needs.
pub fn required_permission(action: &Action) -> Option<Permission> {
    match action {
        Action::GetPhotos { target } => match target.as_deref() {
            None | Some(ME) => Some(Permission::UserPhotos),
            Some(_) => Some(Permission::FriendsPhotos),
        },
        Action::Publish { publishable, .. } => Some(publishable.required_permission()),
        Action::Get { .. }
        | Action::GetAppRequests
        | Action::GetFriends { .. }
        | Action::GetProfile { .. }
        | Action::PublishWithDialog { .. }
        | Action::Invite(_)
        | Action::DeleteRequest { .. }
        | Action::RequestPermissions { .. }
        | Action::ActivateApp => None,
    }
}

/// Whether an action can only run on an open session
pub fn requires_session(action: &Action) -> bool {
    !matches!(action, Action::ActivateApp)
}
