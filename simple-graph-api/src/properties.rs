//! Field selection for profile and friend queries
//!
//! A [`Properties`] set renders into the graph API's `fields` parameter.
//! Properties that take sub-attributes (currently only `picture`) render as
//! `name.attr(value)` chains.

use serde::{Deserialize, Serialize};

/// Fields returned for friends when no selection is given. Retrievable
/// without extra permissions.
pub const DEFAULT_FRIEND_FIELDS: &[&str] = &["id", "name"];

/// Fields returned for the own profile when no selection is given
pub const DEFAULT_PROFILE_FIELDS: &[&str] = &[
    "id",
    "name",
    "first_name",
    "middle_name",
    "last_name",
    "gender",
    "locale",
    "languages",
    "link",
    "username",
    "timezone",
    "updated_time",
    "verified",
    "bio",
    "birthday",
    "education",
    "email",
    "hometown",
    "location",
    "political",
    "favorite_athletes",
    "favorite_teams",
    "quotes",
    "relationship_status",
    "religion",
    "website",
    "work",
];

/// Picture crop type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureType {
    Square,
    Small,
    Normal,
    Large,
}

impl PictureType {
    pub fn value(&self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Small => "small",
            Self::Normal => "normal",
            Self::Large => "large",
        }
    }
}

/// Sub-attributes of the `picture` property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureAttributes {
    pub picture_type: Option<PictureType>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl PictureAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn picture_type(mut self, picture_type: PictureType) -> Self {
        self.picture_type = Some(picture_type);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    fn render(&self, field: &str) -> String {
        let mut out = field.to_string();
        if let Some(t) = self.picture_type {
            out.push_str(&format!(".type({})", t.value()));
        }
        if let Some(w) = self.width {
            out.push_str(&format!(".width({})", w));
        }
        if let Some(h) = self.height {
            out.push_str(&format!(".height({})", h));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Property {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    picture: Option<PictureAttributes>,
}

/// Ordered, duplicate-free selection of entity fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    entries: Vec<Property>,
}

impl Properties {
    pub const ID: &'static str = "id";
    pub const NAME: &'static str = "name";
    pub const FIRST_NAME: &'static str = "first_name";
    pub const MIDDLE_NAME: &'static str = "middle_name";
    pub const LAST_NAME: &'static str = "last_name";
    pub const GENDER: &'static str = "gender";
    pub const LOCALE: &'static str = "locale";
    pub const LINK: &'static str = "link";
    pub const USER_NAME: &'static str = "username";
    pub const BIRTHDAY: &'static str = "birthday";
    pub const EMAIL: &'static str = "email";
    pub const EDUCATION: &'static str = "education";
    pub const HOMETOWN: &'static str = "hometown";
    pub const LOCATION: &'static str = "location";
    pub const WORK: &'static str = "work";
    pub const AGE_RANGE: &'static str = "age_range";
    pub const INSTALLED: &'static str = "installed";
    pub const PICTURE: &'static str = "picture";

    pub fn builder() -> PropertiesBuilder {
        PropertiesBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.name == name)
    }

    /// Render as the comma separated `fields` parameter value
    pub fn to_fields(&self) -> String {
        self.entries
            .iter()
            .map(|p| match &p.picture {
                Some(attrs) => attrs.render(&p.name),
                None => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Builder for [`Properties`]
#[derive(Debug, Default)]
pub struct PropertiesBuilder {
    entries: Vec<Property>,
}

impl PropertiesBuilder {
    /// Add a plain property. Re-adding a name keeps its first position.
    pub fn add(mut self, name: impl Into<String>) -> Self {
        self.push(name.into(), None);
        self
    }

    /// Add the picture property with sub-attributes
    pub fn add_picture(mut self, attributes: PictureAttributes) -> Self {
        self.push(Properties::PICTURE.to_string(), Some(attributes));
        self
    }

    fn push(&mut self, name: String, picture: Option<PictureAttributes>) {
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                if picture.is_some() {
                    existing.picture = picture;
                }
            }
            None => self.entries.push(Property { name, picture }),
        }
    }

    pub fn build(self) -> Properties {
        Properties {
            entries: self.entries,
        }
    }
}
