//! CLI error types with exit code handling
//!
//! Every command returns [`CliError`], which renders through miette and
//! maps to one of the codes in [`crate::exit_codes`].

use crdform_core::CoreError;
use crdform_kube::AdapterError;
use miette::Diagnostic;
use thiserror::Error;

use crate::display::format_diagnostics;
use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// A plan or configuration failed schema validation
    #[error("Validation failed: {message}")]
    #[diagnostic(code(crdform::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The object does not exist in the cluster
    #[error("{message}")]
    #[diagnostic(code(crdform::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// API call failed, wait timed out, or no cluster is reachable
    #[error("Cluster error: {message}")]
    #[diagnostic(code(crdform::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Bad arguments, unknown resource type, missing CRDs
    #[error("{message}")]
    #[diagnostic(code(crdform::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(crdform::cli::io))]
    Io { message: String },

    /// Some plans of a multi-plan apply failed
    #[error("{failed} of {total} plan(s) failed")]
    #[diagnostic(code(crdform::cli::apply))]
    ApplyFailed {
        failed: usize,
        total: usize,
        /// Exit code of the first failure
        code: i32,
    },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(crdform::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::ApplyFailed { code, .. } => *code,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an IO error with the offending path
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<AdapterError> for CliError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err {
            AdapterError::InvalidPlan { type_name, diagnostics } => CliError::Validation {
                message: format!("{} has {} error(s)", type_name, diagnostics.errors().count()),
                help: Some(format_diagnostics(&diagnostics)),
            },
            AdapterError::NotFound { .. } => CliError::NotFound {
                message,
                help: Some("check the namespace and name, or remove the stale state file".to_string()),
            },
            AdapterError::Offline { .. } | AdapterError::NotConfigured { .. } => CliError::Cluster {
                message,
                help: Some("drop --offline (or CRDFORM_OFFLINE) to reach the cluster".to_string()),
            },
            AdapterError::Connection { .. } | AdapterError::Api { .. } | AdapterError::WaitTimeout { .. } => {
                CliError::Cluster { message, help: None }
            }
            AdapterError::UnknownType { suggestion, .. } => CliError::Usage {
                message,
                help: Some(match suggestion {
                    Some(_) => "run `crdform schema list` to see every type".to_string(),
                    None => "load the CRD with --crds or run `crdform schema list`".to_string(),
                }),
            },
            AdapterError::InvalidImportId(_) | AdapterError::InvalidWaitCondition { .. } => {
                CliError::Validation { message, help: None }
            }
            AdapterError::RequiresReplacement { .. } => CliError::Validation {
                message,
                help: Some("delete the object first, then apply the plan under its new name".to_string()),
            },
            AdapterError::PartiallyApplied { source, .. } => CliError::from(*source),
            _ => CliError::Other { message },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => CliError::Io { message: e.to_string() },
            CoreError::MissingAttribute { .. } => CliError::validation(err.to_string()),
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Other {
            message: format!("YAML error: {}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
