//! CLI commands

pub mod apply;
pub mod delete;
pub mod diff;
pub mod import;
pub mod manifest;
pub mod read;
pub mod schema;
pub mod validate;

use crdform_core::{ImportId, Variant};
use crdform_kube::Provider;

use crate::error::{CliError, Result};

/// Parse a `namespace/name` argument
pub(crate) fn parse_id(id: &str) -> Result<ImportId> {
    id.parse::<ImportId>().map_err(|e| CliError::Validation {
        message: e.to_string(),
        help: Some("identify objects as <namespace>/<name>".to_string()),
    })
}

/// Variant a plan type name refers to
pub(crate) fn plan_variant(provider: &Provider, type_name: &str) -> Variant {
    if provider.catalog().get(Variant::Manifest, type_name).is_some() {
        Variant::Manifest
    } else {
        Variant::Resource
    }
}
