//! Client configuration
//!
//! Configuration is built in code through [`GraphConfig::builder`] or read
//! from a TOML document:
//!
//! ```toml
//! app_id = "625994234086470"
//! namespace = "sromku_sample"
//! read_permissions = ["user_photos", "email"]
//! publish_permissions = ["publish_actions"]
//! ask_publish_on_login = false
//! transition_policy = "queue"
//! ```

use serde::{Deserialize, Serialize};
use simple_graph_api::{Permission, PermissionType, DEFAULT_FRIEND_FIELDS, DEFAULT_PROFILE_FIELDS};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What a session transition does when another one is already in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Wait for the in-flight transition, then run
    #[default]
    Queue,
    /// Fail immediately with `AuthError::Busy`
    Reject,
}

/// Configuration consumed by the session manager and the dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Application identifier, used by dialogs and install reports
    pub app_id: String,
    /// Open graph namespace prefixed to bare story actions
    pub namespace: Option<String>,
    /// Read permissions requested at login
    pub read_permissions: Vec<Permission>,
    /// Publish permissions, deferred to the first publish unless
    /// `ask_publish_on_login` is set
    pub publish_permissions: Vec<Permission>,
    pub ask_publish_on_login: bool,
    pub transition_policy: TransitionPolicy,
    /// Overrides [`DEFAULT_FRIEND_FIELDS`]
    pub default_friend_fields: Option<Vec<String>>,
    /// Overrides [`DEFAULT_PROFILE_FIELDS`]
    pub default_profile_fields: Option<Vec<String>>,
}

impl GraphConfig {
    pub fn builder() -> GraphConfigBuilder {
        GraphConfigBuilder::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: GraphConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::Invalid("app_id must not be empty".into()));
        }
        if let Some(p) = self
            .read_permissions
            .iter()
            .find(|p| p.permission_type() != PermissionType::Read)
        {
            return Err(ConfigError::Invalid(format!(
                "'{}' is a publish permission but is listed in read_permissions",
                p
            )));
        }
        if let Some(p) = self
            .publish_permissions
            .iter()
            .find(|p| p.permission_type() != PermissionType::Publish)
        {
            return Err(ConfigError::Invalid(format!(
                "'{}' is a read permission but is listed in publish_permissions",
                p
            )));
        }
        Ok(())
    }

    /// `fields` value used for friends when the caller selects nothing
    pub fn friend_fields(&self) -> String {
        match &self.default_friend_fields {
            Some(fields) => fields.join(","),
            None => DEFAULT_FRIEND_FIELDS.join(","),
        }
    }

    /// `fields` value used for the profile when the caller selects nothing
    pub fn profile_fields(&self) -> String {
        match &self.default_profile_fields {
            Some(fields) => fields.join(","),
            None => DEFAULT_PROFILE_FIELDS.join(","),
        }
    }

    /// Namespace, if configured and non-empty
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}

/// Builder for [`GraphConfig`]
#[derive(Debug, Default)]
pub struct GraphConfigBuilder {
    config: GraphConfig,
}

impl GraphConfigBuilder {
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = app_id.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Set permissions, sorting each into the read or publish list
    pub fn permissions(mut self, permissions: &[Permission]) -> Self {
        for p in permissions {
            match p.permission_type() {
                PermissionType::Read => self.config.read_permissions.push(*p),
                PermissionType::Publish => self.config.publish_permissions.push(*p),
            }
        }
        self
    }

    pub fn ask_publish_on_login(mut self, ask: bool) -> Self {
        self.config.ask_publish_on_login = ask;
        self
    }

    pub fn transition_policy(mut self, policy: TransitionPolicy) -> Self {
        self.config.transition_policy = policy;
        self
    }

    pub fn default_friend_fields(mut self, fields: &[&str]) -> Self {
        self.config.default_friend_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn default_profile_fields(mut self, fields: &[&str]) -> Self {
        self.config.default_profile_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<GraphConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_splits_permissions() {
        let config = GraphConfig::builder()
            .app_id("123")
            .permissions(&[
                Permission::UserPhotos,
                Permission::PublishAction,
                Permission::Email,
            ])
            .build()
            .unwrap();

        assert_eq!(
            config.read_permissions,
            vec![Permission::UserPhotos, Permission::Email]
        );
        assert_eq!(config.publish_permissions, vec![Permission::PublishAction]);
        assert_eq!(config.transition_policy, TransitionPolicy::Queue);
    }

    #[test]
    fn test_empty_app_id_rejected() {
        let err = GraphConfig::builder().build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_toml() {
        let config = GraphConfig::from_toml_str(
            r#"
            app_id = "625994234086470"
            namespace = "sample"
            read_permissions = ["user_photos", "email"]
            publish_permissions = ["publish_actions"]
            transition_policy = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.app_id, "625994234086470");
        assert_eq!(config.namespace(), Some("sample"));
        assert_eq!(config.read_permissions.len(), 2);
        assert_eq!(config.transition_policy, TransitionPolicy::Reject);
        assert!(!config.ask_publish_on_login);
    }

    #[test]
    fn test_from_toml_rejects_misplaced_permission() {
        let err = GraphConfig::from_toml_str(
            r#"
            app_id = "1"
            read_permissions = ["publish_actions"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("publish_actions"));
    }

    #[test]
    fn test_from_toml_rejects_unknown_permission() {
        let err = GraphConfig::from_toml_str(
            r#"
            app_id = "1"
            read_permissions = ["not_a_scope"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.toml");
        std::fs::write(&path, "app_id = \"42\"\n").unwrap();

        let config = GraphConfig::load(&path).unwrap();
        assert_eq!(config.app_id, "42");
        assert_eq!(config.friend_fields(), "id,name");
    }

    #[test]
    fn test_field_overrides() {
        let config = GraphConfig::builder()
            .app_id("1")
            .default_friend_fields(&["id", "first_name"])
            .build()
            .unwrap();
        assert_eq!(config.friend_fields(), "id,first_name");
        assert!(config.profile_fields().starts_with("id,name,first_name"));
    }
}
