use crate::error::{NocoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DEFAULT_ORG_NAME: &str = "noco";
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

/// Connection settings, usually read from a YAML file.
///
/// ```yaml
/// base_uri: http://localhost:8080
/// auth: { api: "xyz" }
/// org_name: noco
/// project: tasks
/// row_limit: 500
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_uri: String,
    pub auth: AuthToken,
    #[serde(default = "default_org_name")]
    pub org_name: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_org_name() -> String {
    DEFAULT_ORG_NAME.to_string()
}

fn default_row_limit() -> usize {
    DEFAULT_ROW_LIMIT
}

/// Credential sent with every request.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuthToken {
    /// Long-lived API token, sent as `xc-token`.
    Api(String),
    /// Session JWT, sent as `xc-auth`.
    Jwt(String),
}

impl AuthToken {
    pub fn header_name(&self) -> &'static str {
        match self {
            AuthToken::Api(_) => "xc-token",
            AuthToken::Jwt(_) => "xc-auth",
        }
    }

    pub fn secret(&self) -> &str {
        match self {
            AuthToken::Api(t) | AuthToken::Jwt(t) => t,
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            AuthToken::Api(_) => "Api",
            AuthToken::Jwt(_) => "Jwt",
        };
        write!(f, "{kind}(<redacted>)")
    }
}

impl ClientConfig {
    pub fn new(base_uri: impl Into<String>, auth: AuthToken) -> Self {
        ClientConfig {
            base_uri: base_uri.into(),
            auth,
            org_name: default_org_name(),
            project: None,
            row_limit: DEFAULT_ROW_LIMIT,
            timeout_secs: None,
        }
    }

    /// Read and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_uri.trim().is_empty() {
            return Err(NocoError::Config("base_uri must not be empty".into()));
        }
        if self.auth.secret().trim().is_empty() {
            return Err(NocoError::Config("auth token must not be empty".into()));
        }
        if self.row_limit == 0 {
            return Err(NocoError::Config("row_limit must be greater than zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config() {
        let config = ClientConfig::from_yaml_str(
            "base_uri: http://localhost:8080\nauth: { api: abc123 }",
        )
        .unwrap();
        assert_eq!(config.base_uri, "http://localhost:8080");
        assert_eq!(config.org_name, "noco");
        assert_eq!(config.row_limit, DEFAULT_ROW_LIMIT);
        assert_eq!(config.auth.header_name(), "xc-token");
        assert!(config.project.is_none());
    }

    #[test]
    fn test_jwt_auth_header() {
        let config = ClientConfig::from_yaml_str(
            "base_uri: http://noco\nauth: { jwt: ey.abc }\nrow_limit: 25\nproject: tasks",
        )
        .unwrap();
        assert_eq!(config.auth.header_name(), "xc-auth");
        assert_eq!(config.auth.secret(), "ey.abc");
        assert_eq!(config.row_limit, 25);
        assert_eq!(config.project.as_deref(), Some("tasks"));
    }

    #[test]
    fn test_rejects_zero_row_limit() {
        let err = ClientConfig::from_yaml_str(
            "base_uri: http://noco\nauth: { api: t }\nrow_limit: 0",
        )
        .unwrap_err();
        assert!(matches!(err, NocoError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_token() {
        let err =
            ClientConfig::from_yaml_str("base_uri: http://noco\nauth: { api: '' }").unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new("http://noco", AuthToken::Api("s3cret".into()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "base_uri: https://app.nocodb.com\nauth:\n  api: tok\norg_name: acme").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.org_name, "acme");
        assert_eq!(config.auth, AuthToken::Api("tok".into()));
    }
}
