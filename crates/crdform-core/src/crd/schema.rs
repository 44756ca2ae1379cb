//! CRD schema representation
//!
//! Only the parts of a CustomResourceDefinition that shape attributes are
//! kept: naming, scope, served versions and the OpenAPI v3 property tree
//! with the constraints that become validators.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed CustomResourceDefinition
#[derive(Debug, Clone, PartialEq)]
pub struct CrdSchema {
    /// Full CRD name (e.g., "listeners.getambassador.io")
    pub name: String,
    pub group: String,
    pub scope: CrdScope,
    pub names: CrdNames,
    pub versions: Vec<CrdVersionSchema>,
}

impl CrdSchema {
    /// Versions the API server serves; the others get no resource type
    pub fn served_versions(&self) -> impl Iterator<Item = &CrdVersionSchema> {
        self.versions.iter().filter(|v| v.served)
    }
}

/// Whether objects live in a namespace or at cluster level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrdScope {
    #[default]
    Namespaced,
    Cluster,
}

impl CrdScope {
    /// Read `spec.scope`; anything but "Cluster" is namespaced
    pub fn from_spec(scope: Option<&str>) -> Self {
        match scope {
            Some("Cluster") => Self::Cluster,
            _ => Self::Namespaced,
        }
    }
}

/// Kind and REST plural of a CRD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrdNames {
    pub kind: String,
    pub plural: String,
}

/// One entry of `spec.versions`
#[derive(Debug, Clone, PartialEq)]
pub struct CrdVersionSchema {
    pub name: String,
    pub served: bool,
    pub deprecated: bool,
    pub deprecation_warning: Option<String>,
    /// The `openAPIV3Schema` node, absent for schemaless versions
    pub root: Option<SchemaProperty>,
}

impl CrdVersionSchema {
    pub fn spec_schema(&self) -> Option<&SchemaProperty> {
        self.root.as_ref()?.property("spec")
    }

    pub fn status_schema(&self) -> Option<&SchemaProperty> {
        self.root.as_ref()?.property("status")
    }

    /// Whether the root schema lists `spec` as required
    pub fn spec_required(&self) -> bool {
        self.root.as_ref().is_some_and(|root| root.is_required("spec"))
    }
}

/// A node of the OpenAPI property tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaProperty {
    pub type_: PropertyType,
    pub description: Option<String>,
    /// The API server fills a default when the field is omitted
    pub has_default: bool,
    /// Int-or-string, preserve-unknown-fields or embedded resource: any JSON goes
    pub free_form: bool,
    pub properties: BTreeMap<String, SchemaProperty>,
    pub required: Vec<String>,
    /// Element schema of arrays
    pub items: Option<Box<SchemaProperty>>,
    /// Value schema of string-keyed maps (`additionalProperties` with a schema)
    pub values: Option<Box<SchemaProperty>>,
    pub constraints: Constraints,
}

impl SchemaProperty {
    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Validation keywords of a property, read straight from the OpenAPI node
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    #[serde(rename = "enum")]
    pub enum_values: Vec<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// OpenAPI v3.0 boolean form
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
}

/// OpenAPI `type` of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    #[default]
    Object,
    /// Missing or unrecognized `type`
    Unknown,
}

impl PropertyType {
    pub fn parse(s: &str) -> Self {
        match s {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::Unknown,
        }
    }
}
