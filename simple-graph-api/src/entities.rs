//! Graph entities: publishable payloads and decoded responses

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::params::Params;
use crate::permission::Permission;

// ============================================================================
// Publishable payloads
// ============================================================================

/// Link attached below a feed post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAction {
    pub name: String,
    pub link: String,
}

/// A post on a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub message: Option<String>,
    pub name: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub link: Option<String>,
    pub place: Option<String>,
    /// Free-form key/value lines shown under the attachment
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub actions: Vec<FeedAction>,
}

impl Feed {
    pub fn builder() -> FeedBuilder {
        FeedBuilder::default()
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert_opt("message", self.message.clone());
        params.insert_opt("name", self.name.clone());
        params.insert_opt("caption", self.caption.clone());
        params.insert_opt("description", self.description.clone());
        params.insert_opt("picture", self.picture.clone());
        params.insert_opt("link", self.link.clone());
        params.insert_opt("place", self.place.clone());
        if !self.properties.is_empty() {
            params.insert("properties", json_string(&self.properties));
        }
        if !self.actions.is_empty() {
            params.insert("actions", json_string(&self.actions));
        }
        params
    }
}

/// Builder for [`Feed`]
#[derive(Debug, Default)]
pub struct FeedBuilder {
    feed: Feed,
}

impl FeedBuilder {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.feed.message = Some(message.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.feed.name = Some(name.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.feed.caption = Some(caption.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.feed.description = Some(description.into());
        self
    }

    pub fn picture(mut self, url: impl Into<String>) -> Self {
        self.feed.picture = Some(url.into());
        self
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.feed.link = Some(url.into());
        self
    }

    pub fn place(mut self, place_id: impl Into<String>) -> Self {
        self.feed.place = Some(place_id.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.feed.properties.insert(key.into(), value.into());
        self
    }

    pub fn action(mut self, name: impl Into<String>, link: impl Into<String>) -> Self {
        self.feed.actions.push(FeedAction {
            name: name.into(),
            link: link.into(),
        });
        self
    }

    pub fn build(self) -> Feed {
        self.feed
    }
}

/// An open graph story: `action` performed on an object of `object_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Action name, either bare (`cook`) or namespaced (`myapp:cook`)
    pub action: String,
    pub object_type: String,
    pub object_url: String,
    pub message: Option<String>,
    pub place: Option<String>,
    #[serde(default)]
    pub explicitly_shared: bool,
}

impl Story {
    pub fn new(
        action: impl Into<String>,
        object_type: impl Into<String>,
        object_url: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            object_type: object_type.into(),
            object_url: object_url.into(),
            message: None,
            place: None,
            explicitly_shared: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn explicitly_shared(mut self) -> Self {
        self.explicitly_shared = true;
        self
    }

    /// Edge of the story; a bare action needs the app namespace
    pub fn edge(&self, namespace: Option<&str>) -> Option<String> {
        if self.action.contains(':') {
            return Some(self.action.clone());
        }
        namespace
            .filter(|ns| !ns.is_empty())
            .map(|ns| format!("{}:{}", ns, self.action))
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new().with(self.object_type.clone(), self.object_url.clone());
        params.insert_opt("message", self.message.clone());
        params.insert_opt("place", self.place.clone());
        if self.explicitly_shared {
            params.insert("fb:explicitly_shared", "true");
        }
        params
    }
}

/// Image content of a photo upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSource {
    Bytes(Vec<u8>),
    Url(String),
}

/// A photo to upload into an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub source: PhotoSource,
    pub caption: Option<String>,
    pub place: Option<String>,
}

impl PhotoUpload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: PhotoSource::Bytes(bytes),
            caption: None,
            place: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: PhotoSource::Url(url.into()),
            caption: None,
            place: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn to_params(&self) -> Params {
        let mut params = match &self.source {
            PhotoSource::Bytes(bytes) => Params::new().with("source", bytes.clone()),
            PhotoSource::Url(url) => Params::new().with("url", url.clone()),
        };
        params.insert_opt("name", self.caption.clone());
        params.insert_opt("place", self.place.clone());
        params
    }
}

/// Kind of publishable payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    Feed,
    Story,
    Photo,
}

/// Anything that can be sent as the payload of a publish action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "payload")]
pub enum Publishable {
    Feed(Feed),
    Story(Story),
    Photo(PhotoUpload),
}

impl Publishable {
    pub fn kind(&self) -> PublishKind {
        match self {
            Self::Feed(_) => PublishKind::Feed,
            Self::Story(_) => PublishKind::Story,
            Self::Photo(_) => PublishKind::Photo,
        }
    }

    /// Permission a silent publish of this payload needs
    pub fn required_permission(&self) -> Permission {
        match self.kind() {
            PublishKind::Feed | PublishKind::Story => Permission::PublishAction,
            PublishKind::Photo => Permission::PublishStream,
        }
    }

    /// Edge the payload is posted to; `None` for a bare story action
    /// without a namespace
    pub fn edge(&self, namespace: Option<&str>) -> Option<String> {
        match self {
            Self::Feed(_) => Some("feed".to_string()),
            Self::Story(story) => story.edge(namespace),
            Self::Photo(_) => Some("photos".to_string()),
        }
    }

    pub fn to_params(&self) -> Params {
        match self {
            Self::Feed(feed) => feed.to_params(),
            Self::Story(story) => story.to_params(),
            Self::Photo(photo) => photo.to_params(),
        }
    }
}

impl From<Feed> for Publishable {
    fn from(feed: Feed) -> Self {
        Self::Feed(feed)
    }
}

impl From<Story> for Publishable {
    fn from(story: Story) -> Self {
        Self::Story(story)
    }
}

impl From<PhotoUpload> for Publishable {
    fn from(photo: PhotoUpload) -> Self {
        Self::Photo(photo)
    }
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

// ============================================================================
// Decoded entities
// ============================================================================

/// Minimal `{id, name}` reference to another entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdName {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PictureData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_silhouette: bool,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    pub data: PictureData,
}

/// A user profile. Unknown fields land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub locale: Option<String>,
    pub link: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<String>,
    pub picture: Option<Picture>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn picture_url(&self) -> Option<&str> {
        self.picture.as_ref().and_then(|p| p.data.url.as_deref())
    }
}

/// A photo as returned by the photos edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Photo {
    pub id: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub picture: Option<String>,
    pub link: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_time: Option<String>,
    pub from: Option<IdName>,
}

/// An app request sent to or by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppRequest {
    pub id: String,
    pub message: Option<String>,
    pub data: Option<String>,
    pub created_time: Option<String>,
    pub from: Option<IdName>,
    pub to: Option<IdName>,
    pub application: Option<IdName>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paging {
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// One page of a list edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl<T> Page<T> {
    /// URL of the next page, if any
    pub fn next(&self) -> Option<&str> {
        self.paging.as_ref().and_then(|p| p.next.as_deref())
    }

    pub fn has_next(&self) -> bool {
        self.next().is_some()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            paging: None,
        }
    }
}
