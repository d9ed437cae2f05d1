//! Permission scopes and set algebra
//!
//! Every [`Permission`] has a fixed wire value (the scope string the graph
//! API understands) and a fixed [`PermissionType`]. Granted permissions are
//! tracked as wire strings because the session provider may grant scopes
//! this crate does not model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Permission class: read scopes can be requested at login, publish scopes
/// need a separate escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    Read,
    Publish,
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

macro_rules! permissions {
    ($($variant:ident => ($wire:literal, $class:ident)),+ $(,)?) => {
        /// A permission scope of the graph API
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Permission {
            $($variant),+
        }

        impl Permission {
            /// All known permissions in declaration order
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            /// Wire value sent to the session provider
            pub fn value(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $wire),+
                }
            }

            /// Read or publish class. Fixed per permission.
            pub fn permission_type(&self) -> PermissionType {
                match self {
                    $(Permission::$variant => PermissionType::$class),+
                }
            }

            /// Look up a permission by its wire value
            pub fn from_value(value: &str) -> Option<Permission> {
                match value {
                    $($wire => Some(Permission::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

permissions! {
    PublicProfile => ("public_profile", Read),
    UserAboutMe => ("user_about_me", Read),
    UserActivities => ("user_activities", Read),
    UserBirthday => ("user_birthday", Read),
    UserCheckins => ("user_checkins", Read),
    UserEducationHistory => ("user_education_history", Read),
    UserEvents => ("user_events", Read),
    UserFriends => ("user_friends", Read),
    UserGroups => ("user_groups", Read),
    UserHometown => ("user_hometown", Read),
    UserInterests => ("user_interests", Read),
    UserLikes => ("user_likes", Read),
    UserLocation => ("user_location", Read),
    UserNotes => ("user_notes", Read),
    UserPhotos => ("user_photos", Read),
    UserRelationships => ("user_relationships", Read),
    UserReligionPolitics => ("user_religion_politics", Read),
    UserStatus => ("user_status", Read),
    UserVideos => ("user_videos", Read),
    UserWebsite => ("user_website", Read),
    UserWorkHistory => ("user_work_history", Read),
    FriendsAboutMe => ("friends_about_me", Read),
    FriendsBirthday => ("friends_birthday", Read),
    FriendsLocation => ("friends_location", Read),
    FriendsPhotos => ("friends_photos", Read),
    Email => ("email", Read),
    ReadFriendlists => ("read_friendlists", Read),
    ReadInsights => ("read_insights", Read),
    ReadMailbox => ("read_mailbox", Read),
    ReadRequests => ("read_requests", Read),
    ReadStream => ("read_stream", Read),
    PublishAction => ("publish_actions", Publish),
    PublishStream => ("publish_stream", Publish),
    PublishCheckins => ("publish_checkins", Publish),
    AdsManagement => ("ads_management", Publish),
    CreateEvent => ("create_event", Publish),
    ManageFriendlists => ("manage_friendlists", Publish),
    ManageNotifications => ("manage_notifications", Publish),
    ManagePages => ("manage_pages", Publish),
    RsvpEvent => ("rsvp_event", Publish),
}

impl Permission {
    pub fn is_publish(&self) -> bool {
        self.permission_type() == PermissionType::Publish
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Error for a wire value that names no known permission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl fmt::Display for UnknownPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission: {}", self.0)
    }
}

impl std::error::Error for UnknownPermission {}

impl TryFrom<String> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Permission::from_value(&value).ok_or(UnknownPermission(value))
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.value().to_string()
    }
}

// ============================================================================
// Set algebra
// ============================================================================

/// Permissions in `required` whose wire value is absent from `granted`
pub fn difference<'a, I>(required: I, granted: &BTreeSet<String>) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = &'a Permission>,
{
    required
        .into_iter()
        .filter(|p| !granted.contains(p.value()))
        .copied()
        .collect()
}

/// Whether every required permission has been granted
pub fn is_satisfied<'a, I>(required: I, granted: &BTreeSet<String>) -> bool
where
    I: IntoIterator<Item = &'a Permission>,
{
    difference(required, granted).is_empty()
}

/// Split permissions into (read, publish) subsets
pub fn split_by_type<'a, I>(permissions: I) -> (BTreeSet<Permission>, BTreeSet<Permission>)
where
    I: IntoIterator<Item = &'a Permission>,
{
    permissions
        .into_iter()
        .copied()
        .partition(|p| p.permission_type() == PermissionType::Read)
}

/// Wire values of a permission collection
pub fn wire_values<'a, I>(permissions: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Permission>,
{
    permissions
        .into_iter()
        .map(|p| p.value().to_string())
        .collect()
}
