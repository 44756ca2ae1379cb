//! crdform core - schema descriptors for Kubernetes custom resources
//!
//! This crate provides:
//! - **CRD parsing**: OpenAPI schemas of CustomResourceDefinitions
//! - **Schema descriptors**: Terraform-style attributes, presence and validators
//!   built from a CRD version, in resource, data source and manifest variants
//! - **Conversion**: the dynamic property bag (snake_case state) to and from
//!   Kubernetes objects
//! - **Validation**: plan and configuration checks with attribute paths
//! - **Import identifiers** and **diagnostics**
//! - **Catalog**: every resource type loaded from CRD files

pub mod attribute;
pub mod catalog;
pub mod convert;
pub mod crd;
pub mod diagnostics;
pub mod error;
pub mod import;
pub mod naming;
pub mod resource;
pub mod suggestions;
pub mod validation;
pub mod validators;

pub use attribute::{Attribute, AttributeType, ObjectType, Presence};
pub use catalog::{Catalog, DEFAULT_PROVIDER_NAME, KindEntry};
pub use convert::{normalize, object_to_state, state_to_object};
pub use crd::{CrdParser, CrdSchema, CrdScope};
pub use diagnostics::{AttributePath, Diagnostic, Diagnostics, Severity};
pub use error::{CoreError, Result};
pub use import::{ImportId, resource_id};
pub use resource::{ApiMeta, ResourceSchema, Variant, keys};
pub use validation::{validate_config, validate_plan};
pub use validators::{Pattern, Validator};
