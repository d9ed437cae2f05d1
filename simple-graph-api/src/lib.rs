//! simple-graph-api: Shared types for the simple-graph client
//!
//! This crate defines the data exchanged between the application, the
//! dispatch engine and the graph transport: permission scopes, publishable
//! payloads, decoded entities and field selections.

pub mod entities;
pub mod params;
pub mod permission;
pub mod properties;

pub use entities::{
    AppRequest, Feed, FeedAction, FeedBuilder, IdName, Page, Paging, Photo, PhotoSource,
    PhotoUpload, Picture, PictureData, Profile, PublishKind, Publishable, Story,
};
pub use params::{ParamValue, Params};
pub use permission::{
    difference, is_satisfied, split_by_type, wire_values, Permission, PermissionType,
    UnknownPermission,
};
pub use properties::{
    PictureAttributes, PictureType, Properties, PropertiesBuilder, DEFAULT_FRIEND_FIELDS,
    DEFAULT_PROFILE_FIELDS,
};
