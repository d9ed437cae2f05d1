//! Validation and request shaping per action variant

use simple_graph_api::{Params, Properties, Publishable};

use crate::config::GraphConfig;
use crate::error::{ActionError, ActionResult};
use crate::permission::ME;
use crate::transport::GraphRequest;

use super::Action;

/// Install event reported by [`Action::ActivateApp`]
const INSTALL_EVENT: &str = "MOBILE_APP_INSTALL";

/// Check a compound `{userId}_{requestId}` app request id
pub fn validate_request_id(request_id: &str) -> ActionResult<()> {
    let valid = match request_id.split_once('_') {
        Some((user, request)) => is_id_segment(user) && is_id_segment(request),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ActionError::invalid_argument(
            "request_id",
            format!("'{}' is not of the form {{userId}}_{{requestId}}", request_id),
        ))
    }
}

fn is_id_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric())
}

fn require_target(arg: &str, target: &str) -> ActionResult<()> {
    if target.trim().is_empty() {
        Err(ActionError::invalid_argument(arg, "must not be empty"))
    } else {
        Ok(())
    }
}

fn fields(properties: Option<&Properties>, default: impl FnOnce() -> String) -> String {
    match properties {
        Some(properties) if !properties.is_empty() => properties.to_fields(),
        _ => default(),
    }
}

impl Action {
    /// Reject malformed input before anything is sent
    pub fn validate(&self) -> ActionResult<()> {
        match self {
            Self::Get { target, .. } | Self::GetProfile { target, .. } => {
                require_target("target", target)
            }
            Self::GetPhotos {
                target: Some(target),
            } => require_target("target", target),
            Self::Publish { publishable, target } => {
                require_target("target", target)?;
                if let Publishable::Story(story) = publishable {
                    if story.action.trim().is_empty() {
                        return Err(ActionError::invalid_argument(
                            "action",
                            "story action must not be empty",
                        ));
                    }
                }
                Ok(())
            }
            Self::PublishWithDialog { target, .. } => require_target("target", target),
            Self::DeleteRequest { request_id } => validate_request_id(request_id),
            Self::GetPhotos { target: None }
            | Self::GetAppRequests
            | Self::GetFriends { .. }
            | Self::Invite(_)
            | Self::RequestPermissions { .. }
            | Self::ActivateApp => Ok(()),
        }
    }

    /// Shape the graph request, or `None` for actions served without one
    /// (dialogs, permission requests)
    pub fn to_request(&self, config: &GraphConfig) -> ActionResult<Option<GraphRequest>> {
        let request = match self {
            Self::Get {
                target,
                edge,
                params,
            } => GraphRequest::get(target.as_str(), edge.as_deref()).with_params(params.clone()),
            Self::GetAppRequests => GraphRequest::get(ME, Some("apprequests")),
            Self::GetFriends { properties } => {
                let fields = fields(properties.as_ref(), || config.friend_fields());
                GraphRequest::get(ME, Some("friends"))
                    .with_params(Params::new().with("fields", fields))
            }
            Self::GetProfile { target, properties } => {
                let fields = fields(properties.as_ref(), || config.profile_fields());
                GraphRequest::get(target.as_str(), None)
                    .with_params(Params::new().with("fields", fields))
            }
            Self::GetPhotos { target } => {
                GraphRequest::get(target.as_deref().unwrap_or(ME), Some("photos"))
            }
            Self::Publish { publishable, target } => {
                let edge = publishable.edge(config.namespace()).ok_or_else(|| {
                    ActionError::invalid_argument(
                        "namespace",
                        "a story with a bare action needs a configured namespace",
                    )
                })?;
                GraphRequest::post(target.as_str(), Some(&edge))
                    .with_params(publishable.to_params())
            }
            Self::DeleteRequest { request_id } => GraphRequest::delete(request_id.as_str()),
            Self::ActivateApp => GraphRequest::post(config.app_id.as_str(), Some("activities"))
                .with_params(Params::new().with("event", INSTALL_EVENT)),
            Self::PublishWithDialog { .. } | Self::Invite(_) | Self::RequestPermissions { .. } => {
                return Ok(None)
            }
        };
        Ok(Some(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpMethod;
    use simple_graph_api::{Feed, PictureAttributes, PictureType, Story};

    fn config() -> GraphConfig {
        GraphConfig::builder()
            .app_id("625994234086470")
            .namespace("sample")
            .build()
            .unwrap()
    }

    #[test]
    fn test_request_id_validation() {
        assert!(validate_request_id("12345_67890").is_ok());
        assert!(validate_request_id("12345").is_err());
        assert!(validate_request_id("_67890").is_err());
        assert!(validate_request_id("12345_").is_err());
        assert!(validate_request_id("12_34_56").is_err());
        assert!(validate_request_id("ab/c_1").is_err());
    }

    #[test]
    fn test_delete_validation_error_names_argument() {
        let err = Action::DeleteRequest {
            request_id: "12345".into(),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ActionError::InvalidArgument { ref arg, .. } if arg == "request_id"));
    }

    #[test]
    fn test_friends_default_fields() {
        let request = Action::GetFriends { properties: None }
            .to_request(&config())
            .unwrap()
            .unwrap();
        assert_eq!(request.path(), "me/friends");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.params.text("fields"), Some("id,name"));
    }

    #[test]
    fn test_profile_selected_fields() {
        let properties = Properties::builder()
            .add(Properties::ID)
            .add_picture(
                PictureAttributes::new()
                    .picture_type(PictureType::Square)
                    .width(100)
                    .height(100),
            )
            .build();
        let request = Action::GetProfile {
            target: ME.into(),
            properties: Some(properties),
        }
        .to_request(&config())
        .unwrap()
        .unwrap();

        assert_eq!(request.path(), "me");
        assert_eq!(
            request.params.text("fields"),
            Some("id,picture.type(square).width(100).height(100)")
        );
    }

    #[test]
    fn test_photos_default_target() {
        let request = Action::GetPhotos { target: None }
            .to_request(&config())
            .unwrap()
            .unwrap();
        assert_eq!(request.path(), "me/photos");
    }

    #[test]
    fn test_story_uses_namespace() {
        let story = Story::new("cook", "meal", "http://example.com/meal");
        let request = Action::Publish {
            publishable: Publishable::Story(story),
            target: ME.into(),
        }
        .to_request(&config())
        .unwrap()
        .unwrap();

        assert_eq!(request.path(), "me/sample:cook");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.params.text("meal"), Some("http://example.com/meal"));
    }

    #[test]
    fn test_story_without_namespace_rejected() {
        let config = GraphConfig::builder().app_id("1").build().unwrap();
        let err = Action::Publish {
            publishable: Publishable::Story(Story::new("cook", "meal", "http://x")),
            target: ME.into(),
        }
        .to_request(&config)
        .unwrap_err();
        assert!(matches!(err, ActionError::InvalidArgument { .. }));
    }

    #[test]
    fn test_activate_app_request() {
        let request = Action::ActivateApp.to_request(&config()).unwrap().unwrap();
        assert_eq!(request.path(), "625994234086470/activities");
        assert_eq!(request.params.text("event"), Some("MOBILE_APP_INSTALL"));
    }

    #[test]
    fn test_dialog_has_no_request() {
        let action = Action::PublishWithDialog {
            feed: Feed::builder().message("hi").build(),
            target: ME.into(),
        };
        assert_eq!(action.to_request(&config()).unwrap(), None);
    }
}
