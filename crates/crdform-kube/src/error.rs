//! Error types for crdform-kube

use crdform_core::{AttributePath, CoreError, Diagnostic, Diagnostics, keys};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// REST verb of a failed Kubernetes call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVerb {
    Get,
    Apply,
    Delete,
}

impl fmt::Display for ApiVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVerb::Get => write!(f, "get"),
            ApiVerb::Apply => write!(f, "apply"),
            ApiVerb::Delete => write!(f, "delete"),
        }
    }
}

/// Errors that can occur while driving a custom resource
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// The provider runs without a cluster
    #[error("provider is in offline mode; cannot {operation} {type_name}")]
    Offline {
        type_name: String,
        operation: &'static str,
    },

    /// No client was injected through `configure`
    #[error("{type_name} has no cluster client; configure the provider first")]
    NotConfigured { type_name: String },

    /// Building the cluster client failed
    #[error("cannot connect to the cluster: {message}")]
    Connection { message: String },

    /// Plan or state could not be turned into a Kubernetes object
    #[error("failed to marshal {type_name}: {source}")]
    Marshal {
        type_name: String,
        #[source]
        source: CoreError,
    },

    /// The API server returned an object that does not fit the schema
    #[error("failed to unmarshal {type_name}: {source}")]
    Unmarshal {
        type_name: String,
        #[source]
        source: CoreError,
    },

    /// HTTP 404 on GET or DELETE
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Any other Kubernetes API or transport failure
    #[error("failed to {verb} {kind} '{namespace}/{name}': {source}")]
    Api {
        verb: ApiVerb,
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// Schema validation of a plan failed
    #[error("invalid configuration for {type_name}:\n{diagnostics}")]
    InvalidPlan {
        type_name: String,
        diagnostics: Diagnostics,
    },

    /// The plan moves the object to another name or namespace
    #[error(
        "{type_name} '{id}' cannot be renamed to '{planned}' in place; changing metadata.name or metadata.namespace requires replacement"
    )]
    RequiresReplacement {
        type_name: String,
        id: String,
        planned: String,
    },

    /// Malformed `namespace/name` import identifier
    #[error(transparent)]
    InvalidImportId(CoreError),

    /// A `wait_for` entry could not be evaluated
    #[error("invalid wait condition '{jsonpath}': {message}")]
    InvalidWaitCondition { jsonpath: String, message: String },

    /// A `wait_for` entry was not satisfied in time
    #[error(
        "timed out after {timeout} waiting for {kind} '{namespace}/{name}': {jsonpath} = '{expected}' (last value: {last})"
    )]
    WaitTimeout {
        kind: String,
        namespace: String,
        name: String,
        jsonpath: String,
        expected: String,
        timeout: String,
        last: String,
    },

    /// The object reached the cluster but a later step failed
    ///
    /// `state` describes the applied object and should be persisted.
    #[error("{source}")]
    PartiallyApplied {
        state: Box<Value>,
        #[source]
        source: Box<AdapterError>,
    },

    /// No schema is registered under the type name
    #[error("unknown resource type '{name}'{}", hint(.suggestion))]
    UnknownType {
        name: String,
        suggestion: Option<String>,
    },

    /// YAML rendering of a manifest failed
    #[error("failed to render manifest: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AdapterError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound { .. })
    }

    /// Check if the operation failed because no cluster is available
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            AdapterError::Offline { .. } | AdapterError::NotConfigured { .. }
        )
    }

    /// Classify a kube error from a GET/PATCH/DELETE call
    pub(crate) fn from_api(
        verb: ApiVerb,
        kind: &str,
        namespace: &str,
        name: &str,
        source: kube::Error,
    ) -> Self {
        match &source {
            kube::Error::Api(response) if response.code == 404 && verb != ApiVerb::Apply => {
                AdapterError::NotFound {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            }
            _ => AdapterError::Api {
                verb,
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            },
        }
    }

    /// Convert into Terraform-style diagnostics
    pub fn to_diagnostics(&self) -> Diagnostics {
        let detail = self.to_string();
        let diagnostic = match self {
            AdapterError::InvalidPlan { diagnostics, .. } => return diagnostics.clone(),
            AdapterError::PartiallyApplied { source, .. } => return source.to_diagnostics(),
            AdapterError::Offline { .. } => Diagnostic::error("Provider in offline mode", detail),
            AdapterError::NotConfigured { .. } => {
                Diagnostic::error("Unconfigured Kubernetes client", detail)
            }
            AdapterError::Connection { .. } => {
                Diagnostic::error("Unable to create Kubernetes client", detail)
            }
            AdapterError::Marshal { source, .. } => {
                with_path(Diagnostic::error("Error marshalling resource", detail), source)
            }
            AdapterError::Unmarshal { source, .. } => {
                with_path(Diagnostic::error("Error unmarshalling resource", detail), source)
            }
            AdapterError::NotFound { .. } => Diagnostic::error("Resource not found", detail),
            AdapterError::Api { verb, .. } => {
                let summary = match verb {
                    ApiVerb::Get => "Error getting resource",
                    ApiVerb::Apply => "Error applying resource",
                    ApiVerb::Delete => "Error deleting resource",
                };
                Diagnostic::error(summary, detail)
            }
            AdapterError::RequiresReplacement { .. } => {
                Diagnostic::error("Resource requires replacement", detail)
                    .at(AttributePath::attribute(keys::METADATA))
            }
            AdapterError::InvalidImportId(_) => {
                Diagnostic::error("Invalid import identifier", detail)
            }
            AdapterError::InvalidWaitCondition { .. } => {
                Diagnostic::error("Invalid wait condition", detail)
                    .at(AttributePath::attribute("wait_for"))
            }
            AdapterError::WaitTimeout { .. } => {
                Diagnostic::error("Timed out waiting for condition", detail)
            }
            AdapterError::UnknownType { .. } => Diagnostic::error("Unknown resource type", detail),
            AdapterError::Render(_) => Diagnostic::error("Error rendering manifest", detail),
            AdapterError::Core(_) => Diagnostic::error("Provider error", detail),
        };
        diagnostic.into()
    }
}

fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

fn with_path(diagnostic: Diagnostic, source: &CoreError) -> Diagnostic {
    match source {
        CoreError::Marshal { path, .. } | CoreError::Unmarshal { path, .. } => {
            diagnostic.at(AttributePath::parse(path))
        }
        _ => diagnostic,
    }
}
