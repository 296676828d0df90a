use thiserror::Error;

#[derive(Error, Debug)]
pub enum NocoError {
    #[error("Transport error: {status} from {url}: {body}")]
    Transport {
        status: u16,
        url: String,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Coercion error: {0}")]
    Coercion(#[from] CoercionError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NocoError {
    /// True when the remote service answered with a non-success status.
    pub fn is_transport(&self) -> bool {
        matches!(self, NocoError::Transport { .. })
    }

    /// HTTP status of a failed remote call, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            NocoError::Transport { status, .. } => Some(*status),
            NocoError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Failure to turn a raw stored value into a typed one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("column '{column}': '{raw}' is not an integer")]
    InvalidInteger { column: String, raw: String },

    #[error("column '{column}': '{raw}' is not an ISO-8601 datetime")]
    InvalidDatetime { column: String, raw: String },

    #[error("column '{column}': unrecognized data type '{tag}'")]
    UnrecognizedType { column: String, tag: String },

    #[error("column '{column}': no primary value column to read the related row's title from")]
    MissingDisplayKey { column: String },
}

pub type Result<T> = std::result::Result<T, NocoError>;
