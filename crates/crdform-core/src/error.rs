//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("invalid CRD: {message}")]
    InvalidCrd { message: String },

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be turned into a Kubernetes object
    #[error("cannot marshal attribute '{path}': {message}")]
    Marshal { path: String, message: String },

    /// A Kubernetes object does not fit the declared schema
    #[error("cannot unmarshal field '{path}': {message}")]
    Unmarshal { path: String, message: String },

    #[error("expected import identifier with format: 'namespace/name'. Got: '{id}'")]
    InvalidImportId { id: String },

    #[error("missing required attribute: {path}")]
    MissingAttribute { path: String },

    #[error("invalid schema '{type_name}': {message}")]
    InvalidSchema { type_name: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub(crate) fn invalid_crd(message: impl Into<String>) -> Self {
        Self::InvalidCrd {
            message: message.into(),
        }
    }

    pub(crate) fn marshal(path: impl ToString, message: impl Into<String>) -> Self {
        Self::Marshal {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unmarshal(path: impl ToString, message: impl Into<String>) -> Self {
        Self::Unmarshal {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
