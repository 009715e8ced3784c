//! Endpoint configuration.
//!
//! Holds everything a request needs to know about the server: base address,
//! selected repository, charset and optional credentials. Values are built
//! once and never mutated; the `with_*` methods consume and return `Self`.

use std::env;
use std::fmt;

use serde::Deserialize;

use crate::error::{Result, SesameError};

pub const DEFAULT_ENCODING: &str = "utf-8";

/// User name and password for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Server address and per-client request settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    base_address: String,
    #[serde(default)]
    repository: Option<String>,
    #[serde(default = "default_encoding")]
    encoding: String,
    #[serde(default)]
    credentials: Option<Credentials>,
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

impl EndpointConfig {
    /// Fails with `Config` when `base_address` is empty.
    pub fn new(base_address: &str) -> Result<Self> {
        let config = Self {
            base_address: base_address.to_string(),
            repository: None,
            encoding: default_encoding(),
            credentials: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads `SESAME_URL` (required), `SESAME_REPOSITORY`, `SESAME_ENCODING`,
    /// `SESAME_USER` and `SESAME_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let base = env::var("SESAME_URL")
            .map_err(|_| SesameError::Config("SESAME_URL is not set".to_string()))?;
        let mut config = Self::new(&base)?;
        if let Ok(repository) = env::var("SESAME_REPOSITORY") {
            config = config.with_repository(repository);
        }
        if let Ok(encoding) = env::var("SESAME_ENCODING") {
            config = config.with_encoding(encoding);
        }
        if let Ok(user) = env::var("SESAME_USER") {
            let password = env::var("SESAME_PASSWORD").unwrap_or_default();
            config = config.with_credentials(Credentials::new(user, password));
        }
        Ok(config)
    }

    /// Checks the invariants a deserialized config may have skipped.
    pub fn validate(&self) -> Result<()> {
        if self.base_address.trim().is_empty() {
            return Err(SesameError::Config("base address must not be empty".to_string()));
        }
        if self.encoding.trim().is_empty() {
            return Err(SesameError::Config("encoding must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = None;
        self
    }

    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The selected repository, or `Config` if none (or an empty one) is set.
    pub fn validate_repository_selected(&self) -> Result<&str> {
        match self.repository.as_deref() {
            Some(repository) if !repository.is_empty() => Ok(repository),
            _ => Err(SesameError::Config("no repository has been selected".to_string())),
        }
    }

    /// `;charset=<encoding>`, appended to content-type headers.
    pub fn charset_suffix(&self) -> String {
        format!(";charset={}", self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EndpointConfig::new("http://localhost:8080/openrdf-sesame").unwrap();
        assert_eq!(config.encoding(), "utf-8");
        assert_eq!(config.repository(), None);
        assert!(config.credentials().is_none());
        assert_eq!(config.charset_suffix(), ";charset=utf-8");
    }

    #[test]
    fn empty_base_address_is_rejected() {
        let err = EndpointConfig::new("  ").unwrap_err();
        assert!(matches!(err, SesameError::Config(_)));
    }

    #[test]
    fn repository_must_be_selected() {
        let config = EndpointConfig::new("http://h").unwrap();
        assert!(matches!(config.validate_repository_selected(), Err(SesameError::Config(_))));

        let config = config.with_repository("");
        assert!(matches!(config.validate_repository_selected(), Err(SesameError::Config(_))));

        let config = config.with_repository("people");
        assert_eq!(config.validate_repository_selected().unwrap(), "people");
    }

    #[test]
    fn charset_follows_encoding() {
        let config = EndpointConfig::new("http://h").unwrap().with_encoding("iso-8859-1");
        assert_eq!(config.charset_suffix(), ";charset=iso-8859-1");
    }

    #[test]
    fn debug_hides_password() {
        let creds = Credentials::new("admin", "s3cret");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: EndpointConfig =
            serde_json::from_str(r#"{"base_address":"http://h","repository":"r"}"#).unwrap();
        assert_eq!(config.repository(), Some("r"));
        assert_eq!(config.encoding(), "utf-8");
        assert!(config.validate().is_ok());
    }
}
