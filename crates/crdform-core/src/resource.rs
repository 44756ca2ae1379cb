//! Resource schemas built from CRD versions
//!
//! Every served version of a namespaced CRD yields three schemas that share
//! the same `metadata` and `spec` shape:
//!
//! - [`Variant::Resource`]: managed through server-side apply
//! - [`Variant::DataSource`]: read-only, everything computed, with `status`
//! - [`Variant::Manifest`]: rendered to YAML without contacting a cluster

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::attribute::{Attribute, AttributeType, ObjectType, Presence};
use crate::crd::{CrdSchema, CrdScope, CrdVersionSchema, PropertyType, SchemaProperty};
use crate::diagnostics::{AttributePath, Diagnostic, Diagnostics};
use crate::error::{CoreError, Result};
use crate::naming::{self, MANIFEST_SUFFIX};
use crate::validators::{Pattern, Validator};

/// Root attribute names
pub mod keys {
    pub const ID: &str = "id";
    pub const API_VERSION: &str = "api_version";
    pub const KIND: &str = "kind";
    pub const METADATA: &str = "metadata";
    pub const SPEC: &str = "spec";
    pub const STATUS: &str = "status";
    pub const FORCE_CONFLICTS: &str = "force_conflicts";
    pub const FIELD_MANAGER: &str = "field_manager";
    pub const WAIT_FOR: &str = "wait_for";
    pub const YAML: &str = "yaml";

    pub const NAME: &str = "name";
    pub const NAMESPACE: &str = "namespace";
    pub const LABELS: &str = "labels";
    pub const ANNOTATIONS: &str = "annotations";

    pub const JSONPATH: &str = "jsonpath";
    pub const VALUE: &str = "value";
    pub const TIMEOUT: &str = "timeout";
}

/// Names reserved by Terraform at the root of a resource
const RESERVED_ROOT_NAMES: &[&str] = &[
    "connection",
    "count",
    "depends_on",
    "for_each",
    "lifecycle",
    "provider",
    "provisioner",
];

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid regex"));

/// Group, version and kind of the objects an adapter manages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiMeta {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Resource name used in REST paths
    pub plural: String,
}

impl ApiMeta {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
        }
    }

    /// `apiVersion` of the objects, e.g. `elasticache.services.k8s.aws/v1alpha1`
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Group/version/resource triple, e.g. `elasticache.services.k8s.aws/v1alpha1/cacheparametergroups`
    pub fn gvr(&self) -> String {
        format!("{}/{}", self.api_version(), self.plural)
    }
}

impl fmt::Display for ApiMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Flavor of a resource schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Resource,
    DataSource,
    Manifest,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource => write!(f, "resource"),
            Self::DataSource => write!(f, "data source"),
            Self::Manifest => write!(f, "manifest"),
        }
    }
}

/// Declarative description of one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    pub type_name: String,
    pub api: ApiMeta,
    pub variant: Variant,
    pub description: String,
    pub attributes: ObjectType,
}

impl ResourceSchema {
    pub fn new(
        type_name: impl Into<String>,
        api: ApiMeta,
        variant: Variant,
        attributes: ObjectType,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            api,
            variant,
            description: String::new(),
            attributes,
        }
    }

    /// Build the schema of one variant from a CRD version
    ///
    /// Constraints that cannot be expressed (patterns the regex engine does
    /// not support, field names that collide after snake-casing) are dropped
    /// and reported as warnings.
    pub fn from_crd(
        provider: &str,
        crd: &CrdSchema,
        version: &CrdVersionSchema,
        variant: Variant,
        warnings: &mut Diagnostics,
    ) -> Result<Self> {
        let base_name = naming::type_name(provider, &crd.group, &crd.names.kind, &version.name);
        let type_name = match variant {
            Variant::Manifest => format!("{}{}", base_name, MANIFEST_SUFFIX),
            _ => base_name,
        };

        if crd.scope == CrdScope::Cluster {
            return Err(CoreError::InvalidSchema {
                type_name,
                message: "cluster-scoped resources are not supported".to_string(),
            });
        }

        let api = ApiMeta::new(&crd.group, &version.name, &crd.names.kind, &crd.names.plural);
        let mode = match variant {
            Variant::DataSource => Mode::Computed,
            _ => Mode::Configurable,
        };

        let mut builder = Builder {
            type_name: &type_name,
            mode,
            warnings,
        };

        let mut attributes = ObjectType::new()
            .with(
                keys::ID,
                Attribute::computed(keys::ID, AttributeType::String)
                    .with_description("Identifier in the form 'name/namespace'."),
            )
            .with(
                keys::API_VERSION,
                Attribute::computed("apiVersion", AttributeType::String)
                    .with_description("The API version of the resource."),
            )
            .with(
                keys::KIND,
                Attribute::computed("kind", AttributeType::String)
                    .with_description("The kind of the resource."),
            );

        if variant == Variant::Resource {
            attributes = with_apply_knobs(attributes);
        }

        attributes.insert(keys::METADATA, metadata_attribute(mode));

        let spec_path = AttributePath::attribute(keys::SPEC);
        let spec = match version.spec_schema() {
            Some(spec) => {
                let presence = mode.presence(version.spec_required(), spec.has_default);
                builder.attribute("spec", spec, presence, &spec_path)
            }
            None => Attribute::new("spec", AttributeType::Dynamic, mode.presence(false, false)),
        };
        attributes.insert(
            keys::SPEC,
            spec.description_or(format!("Specification of the desired state of the {}.", crd.names.kind)),
        );

        if variant == Variant::DataSource {
            let status_path = AttributePath::attribute(keys::STATUS);
            let status = match version.status_schema() {
                Some(status) => builder.attribute("status", status, Presence::Computed, &status_path),
                None => Attribute::computed("status", AttributeType::Dynamic),
            };
            attributes.insert(
                keys::STATUS,
                status.description_or(format!("Observed state of the {}.", crd.names.kind)),
            );
        }

        if variant == Variant::Manifest {
            attributes.insert(
                keys::YAML,
                Attribute::computed(keys::YAML, AttributeType::String)
                    .with_description("The generated manifest in YAML format."),
            );
        }

        let mut description = match variant {
            Variant::Resource => format!("Manages a {} ({}) object.", crd.names.kind, api.api_version()),
            Variant::DataSource => format!("Reads a {} ({}) object.", crd.names.kind, api.api_version()),
            Variant::Manifest => format!(
                "Renders a {} ({}) object as YAML without contacting a cluster.",
                crd.names.kind,
                api.api_version()
            ),
        };
        if version.deprecated {
            description.push_str(" Deprecated");
            match &version.deprecation_warning {
                Some(warning) => {
                    description.push_str(": ");
                    description.push_str(warning);
                }
                None => description.push('.'),
            }
        }

        Ok(Self {
            type_name,
            api,
            variant,
            description,
            attributes,
        })
    }

    /// Look up an attribute by dotted path, e.g. `metadata.name`
    pub fn attribute(&self, path: &str) -> Option<&Attribute> {
        self.attributes.get_path(path)
    }

    /// Self-check of the schema declaration
    ///
    /// Returns one error diagnostic per problem; an empty result means the
    /// schema is usable.
    pub fn validate_implementation(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();

        if !IDENTIFIER.is_match(&self.type_name) {
            diags.add_error(
                "Invalid type name",
                format!("'{}' is not a valid identifier", self.type_name),
            );
        }
        if self.api.kind.is_empty() || self.api.version.is_empty() || self.api.plural.is_empty() {
            diags.add_error(
                "Incomplete API metadata",
                format!("{} must have a version, kind and plural", self.type_name),
            );
        }

        for name in [keys::ID, keys::API_VERSION, keys::KIND] {
            match self.attributes.get(name) {
                Some(attr) if attr.presence == Presence::Computed => {}
                Some(_) => diags.add_attribute_error(
                    AttributePath::attribute(name),
                    "Invalid attribute presence",
                    "attribute must be computed",
                ),
                None => diags.add_attribute_error(
                    AttributePath::attribute(name),
                    "Missing attribute",
                    format!("{} schemas must declare '{}'", self.variant, name),
                ),
            }
        }

        self.check_metadata(&mut diags);
        self.check_variant_attributes(&mut diags);
        check_object(&self.attributes, &AttributePath::root(), false, &mut diags);

        diags
    }

    fn check_metadata(&self, diags: &mut Diagnostics) {
        let path = AttributePath::attribute(keys::METADATA);
        let Some(metadata) = self.attributes.get(keys::METADATA) else {
            diags.add_attribute_error(path, "Missing attribute", "schemas must declare 'metadata'");
            return;
        };
        if !metadata.presence.is_required() {
            diags.add_attribute_error(path.clone(), "Invalid attribute presence", "metadata must be required");
        }
        let Some(fields) = metadata.object() else {
            diags.add_attribute_error(path, "Invalid attribute type", "metadata must be an object");
            return;
        };
        for name in [keys::NAME, keys::NAMESPACE] {
            match fields.get(name) {
                Some(attr) if attr.presence.is_required() && attr.type_ == AttributeType::String => {}
                _ => diags.add_attribute_error(
                    path.child(name),
                    "Invalid identity attribute",
                    format!("metadata.{} must be a required string", name),
                ),
            }
        }
    }

    fn check_variant_attributes(&self, diags: &mut Diagnostics) {
        let (expected, forbidden): (&[&str], &[&str]) = match self.variant {
            Variant::Resource => (
                &[keys::FORCE_CONFLICTS, keys::FIELD_MANAGER, keys::WAIT_FOR],
                &[keys::STATUS, keys::YAML],
            ),
            Variant::DataSource => (&[keys::STATUS], &[keys::YAML, keys::WAIT_FOR]),
            Variant::Manifest => (&[keys::YAML], &[keys::STATUS, keys::WAIT_FOR]),
        };

        for name in expected {
            if !self.attributes.contains(name) {
                diags.add_attribute_error(
                    AttributePath::attribute(*name),
                    "Missing attribute",
                    format!("{} schemas must declare '{}'", self.variant, name),
                );
            }
        }
        for name in forbidden {
            if self.attributes.contains(name) {
                diags.add_attribute_error(
                    AttributePath::attribute(*name),
                    "Unexpected attribute",
                    format!("{} schemas must not declare '{}'", self.variant, name),
                );
            }
        }
        for name in [keys::STATUS, keys::YAML] {
            if let Some(attr) = self.attributes.get(name) {
                if attr.presence != Presence::Computed {
                    diags.add_attribute_error(
                        AttributePath::attribute(name),
                        "Invalid attribute presence",
                        "attribute must be computed",
                    );
                }
            }
        }
    }
}

fn check_object(object: &ObjectType, path: &AttributePath, computed_parent: bool, diags: &mut Diagnostics) {
    let mut json_names = HashSet::new();

    for (name, attr) in object.iter() {
        let attr_path = path.child(name.as_str());

        if !IDENTIFIER.is_match(name) {
            diags.add_attribute_error(
                attr_path.clone(),
                "Invalid attribute name",
                format!("'{}' is not a valid identifier", name),
            );
        }
        if path.is_root() && RESERVED_ROOT_NAMES.contains(&name.as_str()) {
            diags.add_attribute_error(
                attr_path.clone(),
                "Reserved attribute name",
                format!("'{}' is reserved at the root of a resource", name),
            );
        }
        if attr.json_name.is_empty() {
            diags.add_attribute_error(attr_path.clone(), "Missing JSON name", "");
        } else if !json_names.insert(attr.json_name.as_str()) {
            diags.add_attribute_error(
                attr_path.clone(),
                "Duplicate JSON name",
                format!("'{}' is mapped by more than one attribute", attr.json_name),
            );
        }
        if computed_parent && attr.presence.is_configurable() {
            diags.add_attribute_error(
                attr_path.clone(),
                "Invalid attribute presence",
                "attributes nested under a computed attribute must be computed",
            );
        }
        for validator in &attr.validators {
            if let Err(message) = validator.check_definition(&attr.type_) {
                diags.add_attribute_error(attr_path.clone(), "Invalid validator", message);
            }
        }

        let computed = computed_parent || attr.presence == Presence::Computed;
        check_type(&attr.type_, &attr_path, computed, diags);
    }
}

fn check_type(type_: &AttributeType, path: &AttributePath, computed: bool, diags: &mut Diagnostics) {
    match type_ {
        AttributeType::Object(object) => check_object(object, path, computed, diags),
        AttributeType::List(element) => check_type(element, &path.index(0), computed, diags),
        AttributeType::Map(element) => check_type(element, &path.key("*"), computed, diags),
        _ => {}
    }
}

fn with_apply_knobs(attributes: ObjectType) -> ObjectType {
    let wait_condition = ObjectType::new()
        .with(
            keys::JSONPATH,
            Attribute::required(keys::JSONPATH, AttributeType::String)
                .with_description("JSONPath expression evaluated against the object, e.g. '.status.phase'.")
                .with_validator(Validator::LengthBetween { min: Some(1), max: None }),
        )
        .with(
            keys::VALUE,
            Attribute::required(keys::VALUE, AttributeType::String)
                .with_description("Value the expression must yield."),
        )
        .with(
            keys::TIMEOUT,
            Attribute::optional(keys::TIMEOUT, AttributeType::String)
                .with_description("How long to wait, e.g. '30s' or '5m'. Defaults to the provider setting."),
        );

    attributes
        .with(
            keys::FORCE_CONFLICTS,
            Attribute::optional(keys::FORCE_CONFLICTS, AttributeType::Bool)
                .with_description("Take ownership of fields managed by other field managers."),
        )
        .with(
            keys::FIELD_MANAGER,
            Attribute::optional(keys::FIELD_MANAGER, AttributeType::String)
                .with_description("Field manager used for server-side apply.")
                .with_validator(Validator::LengthBetween { min: Some(1), max: Some(128) }),
        )
        .with(
            keys::WAIT_FOR,
            Attribute::optional(keys::WAIT_FOR, AttributeType::list(AttributeType::Object(wait_condition)))
                .with_description("Conditions to wait for after every apply."),
        )
}

fn metadata_attribute(mode: Mode) -> Attribute {
    let (map_presence, map_validators) = match mode {
        Mode::Configurable => (Presence::Optional, true),
        Mode::Computed => (Presence::Computed, false),
    };

    let mut name = Attribute::required(keys::NAME, AttributeType::String)
        .with_description("Unique name of the object within its namespace.")
        .force_new();
    let mut namespace = Attribute::required(keys::NAMESPACE, AttributeType::String)
        .with_description("Namespace of the object.")
        .force_new();
    let mut labels = Attribute::new(keys::LABELS, AttributeType::map(AttributeType::String), map_presence)
        .with_description("Map of string keys and values used to organize and select objects.");
    let mut annotations =
        Attribute::new(keys::ANNOTATIONS, AttributeType::map(AttributeType::String), map_presence)
            .with_description("Unstructured key value map attached to the object.");

    if map_validators {
        name = name.with_validator(Validator::DnsSubdomainName);
        namespace = namespace.with_validator(Validator::DnsLabelName);
        labels = labels.with_validator(Validator::Labels);
        annotations = annotations.with_validator(Validator::Annotations);
    }

    let fields = ObjectType::new()
        .with(keys::NAME, name)
        .with(keys::NAMESPACE, namespace)
        .with(keys::LABELS, labels)
        .with(keys::ANNOTATIONS, annotations);

    Attribute::required("metadata", AttributeType::Object(fields))
        .with_description("Standard object metadata.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Users configure the attributes
    Configurable,
    /// Everything is read from the server
    Computed,
}

impl Mode {
    fn presence(self, required: bool, has_default: bool) -> Presence {
        match self {
            Mode::Computed => Presence::Computed,
            Mode::Configurable if required => Presence::Required,
            Mode::Configurable if has_default => Presence::OptionalComputed,
            Mode::Configurable => Presence::Optional,
        }
    }
}

struct Builder<'a> {
    type_name: &'a str,
    mode: Mode,
    warnings: &'a mut Diagnostics,
}

impl Builder<'_> {
    fn attribute(
        &mut self,
        json_name: &str,
        prop: &SchemaProperty,
        presence: Presence,
        path: &AttributePath,
    ) -> Attribute {
        let type_ = self.attribute_type(prop, path);
        let validators = match self.mode {
            Mode::Configurable => self.validators(prop, &type_, path),
            Mode::Computed => Vec::new(),
        };

        Attribute {
            json_name: json_name.to_string(),
            type_,
            presence,
            description: prop.description.clone(),
            validators,
            force_new: false,
        }
    }

    fn attribute_type(&mut self, prop: &SchemaProperty, path: &AttributePath) -> AttributeType {
        if prop.free_form {
            return AttributeType::Dynamic;
        }

        match &prop.type_ {
            PropertyType::String => AttributeType::String,
            PropertyType::Integer => AttributeType::Int64,
            PropertyType::Number => AttributeType::Float64,
            PropertyType::Boolean => AttributeType::Bool,
            PropertyType::Array => match &prop.items {
                Some(items) => AttributeType::list(self.attribute_type(items, &path.index(0))),
                None => AttributeType::list(AttributeType::Dynamic),
            },
            PropertyType::Object => {
                if !prop.properties.is_empty() {
                    return AttributeType::Object(self.object_type(&prop.properties, &prop.required, path));
                }
                match &prop.values {
                    Some(values) => AttributeType::map(self.attribute_type(values, &path.key("*"))),
                    None => AttributeType::Dynamic,
                }
            }
            PropertyType::Unknown => AttributeType::Dynamic,
        }
    }

    fn object_type(
        &mut self,
        properties: &BTreeMap<String, SchemaProperty>,
        required: &[String],
        path: &AttributePath,
    ) -> ObjectType {
        let mut object = ObjectType::new();

        for (json_name, prop) in properties {
            let name = naming::to_snake_case(json_name);
            let attr_path = path.child(name.as_str());

            if !IDENTIFIER.is_match(&name) {
                self.warn(
                    &attr_path,
                    "Skipped field",
                    format!("field '{}' has no valid attribute name", json_name),
                );
                continue;
            }
            if object.contains(&name) {
                self.warn(
                    &attr_path,
                    "Skipped field",
                    format!("field '{}' collides with another field named '{}'", json_name, name),
                );
                continue;
            }

            let is_required = required.iter().any(|r| r == json_name);
            let presence = self.mode.presence(is_required, prop.has_default);
            let attribute = self.attribute(json_name, prop, presence, &attr_path);
            object.insert(name, attribute);
        }

        object
    }

    fn validators(&mut self, prop: &SchemaProperty, type_: &AttributeType, path: &AttributePath) -> Vec<Validator> {
        let mut validators = Vec::new();
        let c = &prop.constraints;

        if !c.enum_values.is_empty() {
            validators.push(Validator::OneOf(c.enum_values.clone()));
        }

        match type_ {
            AttributeType::Int64 | AttributeType::Float64 => {
                if c.minimum.is_some() || c.maximum.is_some() {
                    validators.push(Validator::NumberBetween {
                        min: c.minimum,
                        max: c.maximum,
                        exclusive_min: c.exclusive_minimum,
                        exclusive_max: c.exclusive_maximum,
                    });
                }
                if let Some(factor) = c.multiple_of.filter(|f| *f > 0.0) {
                    validators.push(Validator::MultipleOf(factor));
                }
            }
            AttributeType::String => {
                if c.min_length.is_some() || c.max_length.is_some() {
                    validators.push(Validator::LengthBetween {
                        min: c.min_length,
                        max: c.max_length,
                    });
                }
                if let Some(pattern) = &c.pattern {
                    match Pattern::new(pattern) {
                        Ok(compiled) => validators.push(Validator::Pattern(compiled)),
                        Err(e) => self.warn(
                            path,
                            "Skipped pattern",
                            format!("pattern '{}' is not supported: {}", pattern, e),
                        ),
                    }
                }
            }
            AttributeType::List(element) => {
                if let Some(items) = &prop.items {
                    let inner = self.validators(items, element, &path.index(0));
                    if !inner.is_empty() {
                        validators.push(Validator::Each(inner));
                    }
                }
                if c.min_items.is_some() || c.max_items.is_some() {
                    validators.push(Validator::SizeBetween {
                        min: c.min_items,
                        max: c.max_items,
                    });
                }
                if c.unique_items {
                    validators.push(Validator::UniqueItems);
                }
            }
            AttributeType::Map(element) => {
                if let Some(values) = &prop.values {
                    let inner = self.validators(values, element, &path.key("*"));
                    if !inner.is_empty() {
                        validators.push(Validator::Each(inner));
                    }
                }
                if c.min_properties.is_some() || c.max_properties.is_some() {
                    validators.push(Validator::SizeBetween {
                        min: c.min_properties,
                        max: c.max_properties,
                    });
                }
            }
            AttributeType::Bool | AttributeType::Object(_) | AttributeType::Dynamic => {}
        }

        validators.retain(|v| match v.check_definition(type_) {
            Ok(()) => true,
            Err(message) => {
                tracing::warn!(type_name = self.type_name, %path, "dropping validator: {}", message);
                false
            }
        });
        validators
    }

    fn warn(&mut self, path: &AttributePath, summary: &str, detail: String) {
        tracing::warn!(type_name = self.type_name, %path, "{}", detail);
        self.warnings
            .push(Diagnostic::warning(summary, format!("{}: {}", self.type_name, detail)).at(path.clone()));
    }
}
