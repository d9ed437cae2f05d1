//! Response decoding per action variant

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ActionError, ActionResult};
use crate::transport::GraphResponse;

use super::{Action, ActionOutput, PublishOutcome};

/// Turn a transport response into the action's typed output
///
/// A body carrying an `error` object is a server rejection regardless of
/// the action.
pub(crate) fn decode(action: &Action, response: GraphResponse) -> ActionResult<ActionOutput> {
    let body = response.body;
    if let Some(error) = body.get("error").filter(|e| e.is_object()) {
        return Err(server_error(error));
    }

    match action {
        Action::Get { .. } => Ok(ActionOutput::Raw(body)),
        Action::GetAppRequests => parse(body).map(ActionOutput::AppRequests),
        Action::GetFriends { .. } => parse(body).map(ActionOutput::Friends),
        Action::GetPhotos { .. } => parse(body).map(ActionOutput::Photos),
        Action::GetProfile { .. } => {
            if !body.is_object() {
                return Err(malformed("profile", &body));
            }
            parse(body).map(ActionOutput::Profile)
        }
        Action::Publish { .. } | Action::PublishWithDialog { .. } => {
            let id = id_field(&body, "id")
                .or_else(|| id_field(&body, "post_id"))
                .ok_or_else(|| malformed("publish result", &body))?;
            Ok(ActionOutput::Published(PublishOutcome::Posted { id: Some(id) }))
        }
        Action::DeleteRequest { .. } => match body.as_bool().or_else(|| success_flag(&body)) {
            Some(true) => Ok(ActionOutput::Deleted),
            Some(false) => Err(ActionError::ServerRejected {
                code: 0,
                message: "request was not deleted".into(),
            }),
            None => Err(malformed("delete result", &body)),
        },
        Action::ActivateApp => Ok(ActionOutput::Activated),
        Action::Invite(_) | Action::RequestPermissions { .. } => Err(ActionError::MalformedResponse(
            format!("{} does not take a graph response", action.name()),
        )),
    }
}

fn parse<T: DeserializeOwned>(body: Value) -> ActionResult<T> {
    serde_json::from_value(body).map_err(|e| ActionError::MalformedResponse(e.to_string()))
}

fn server_error(error: &Value) -> ActionError {
    ActionError::ServerRejected {
        code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    }
}

/// Ids come back as strings, occasionally as numbers
fn id_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn success_flag(body: &Value) -> Option<bool> {
    body.get("success").and_then(Value::as_bool)
}

fn malformed(expected: &str, body: &Value) -> ActionError {
    ActionError::MalformedResponse(format!("unexpected {} body: {}", expected, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simple_graph_api::{Feed, Publishable};

    fn respond(action: &Action, body: Value) -> ActionResult<ActionOutput> {
        decode(action, GraphResponse::new(body))
    }

    fn publish() -> Action {
        Action::Publish {
            publishable: Publishable::Feed(Feed::builder().message("hi").build()),
            target: "me".into(),
        }
    }

    #[test]
    fn test_error_envelope() {
        let err = respond(
            &Action::GetAppRequests,
            json!({"error": {"code": 190, "message": "Invalid OAuth access token"}}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::ServerRejected {
                code: 190,
                message: "Invalid OAuth access token".into()
            }
        );
    }

    #[test]
    fn test_friends_page() {
        let output = respond(
            &Action::GetFriends { properties: None },
            json!({
                "data": [{"id": "1", "name": "Ann"}, {"id": "2", "name": "Bo"}],
                "paging": {"next": "https://graph/next"}
            }),
        )
        .unwrap();

        match output {
            ActionOutput::Friends(page) => {
                assert_eq!(page.data.len(), 2);
                assert_eq!(page.data[0].name.as_deref(), Some("Ann"));
                assert!(page.has_next());
            }
            other => panic!("Expected friends, got {:?}", other),
        }
    }

    #[test]
    fn test_page_without_data_is_malformed() {
        let err = respond(&Action::GetPhotos { target: None }, json!({"paging": {}})).unwrap_err();
        assert!(matches!(err, ActionError::MalformedResponse(_)));
    }

    #[test]
    fn test_profile_requires_object() {
        let err = respond(
            &Action::GetProfile {
                target: "me".into(),
                properties: None,
            },
            json!([1, 2]),
        )
        .unwrap_err();
        assert!(matches!(err, ActionError::MalformedResponse(_)));
    }

    #[test]
    fn test_publish_id() {
        let output = respond(&publish(), json!({"id": "10_20"})).unwrap();
        assert_eq!(
            output,
            ActionOutput::Published(PublishOutcome::Posted {
                id: Some("10_20".into())
            })
        );

        let output = respond(&publish(), json!({"post_id": 42})).unwrap();
        assert_eq!(
            output,
            ActionOutput::Published(PublishOutcome::Posted {
                id: Some("42".into())
            })
        );

        assert!(respond(&publish(), json!({})).is_err());
    }

    #[test]
    fn test_delete_forms() {
        let delete = Action::DeleteRequest {
            request_id: "1_2".into(),
        };
        assert_eq!(respond(&delete, json!(true)).unwrap(), ActionOutput::Deleted);
        assert_eq!(
            respond(&delete, json!({"success": true})).unwrap(),
            ActionOutput::Deleted
        );
        assert!(matches!(
            respond(&delete, json!(false)),
            Err(ActionError::ServerRejected { .. })
        ));
        assert!(matches!(
            respond(&delete, json!("yes")),
            Err(ActionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_raw_get_passthrough() {
        let body = json!({"anything": [1, 2, 3]});
        let output = respond(
            &Action::Get {
                target: "me".into(),
                edge: None,
                params: Default::default(),
            },
            body.clone(),
        )
        .unwrap();
        assert_eq!(output, ActionOutput::Raw(body));
    }
}
